use std::fmt;

use mongodb::bson::{Bson, Document};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Object,
    Array,
    Null,
    String,
    Int,
    Double,
    Bool,
    /// Any other scalar, tagged with the driver's type name (`ObjectId`, `DateTime`, ...).
    Other(&'static str),
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Object => "Object",
            FieldKind::Array => "Array",
            FieldKind::Null => "Null",
            FieldKind::String => "String",
            FieldKind::Int => "Int",
            FieldKind::Double => "Double",
            FieldKind::Bool => "Bool",
            FieldKind::Other(name) => *name,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSummary {
    pub name: String,
    pub kind: FieldKind,
    pub value: String,
}

impl FieldSummary {
    pub fn from_field(name: &str, value: &Bson) -> Self {
        let kind = field_kind(value);
        let value = match kind {
            FieldKind::Object | FieldKind::Array => kind.label().to_string(),
            _ => format_scalar(value),
        };
        Self { name: name.to_string(), kind, value }
    }
}

/// Top-level fields of one document, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocSummary {
    pub fields: Vec<FieldSummary>,
}

impl DocSummary {
    pub fn from_document(document: &Document) -> Self {
        let mut fields: Vec<FieldSummary> =
            document.iter().map(|(name, value)| FieldSummary::from_field(name, value)).collect();
        fields.sort_by(|a, b| a.name.cmp(&b.name));
        Self { fields }
    }

    #[cfg(test)]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name.as_str()).collect()
    }

    /// Single-line rendering used by the document list.
    pub fn one_line(&self) -> String {
        self.fields
            .iter()
            .map(|field| format!("{}: {}", field.name, field.value))
            .collect::<Vec<_>>()
            .join("  ")
    }
}

pub fn summarize(documents: &[Document]) -> Vec<DocSummary> {
    documents.iter().map(DocSummary::from_document).collect()
}

fn field_kind(value: &Bson) -> FieldKind {
    match value {
        Bson::Document(_) => FieldKind::Object,
        Bson::Array(_) => FieldKind::Array,
        Bson::Null | Bson::Undefined => FieldKind::Null,
        Bson::String(_) => FieldKind::String,
        Bson::Int32(_) | Bson::Int64(_) => FieldKind::Int,
        Bson::Double(_) => FieldKind::Double,
        Bson::Boolean(_) => FieldKind::Bool,
        Bson::Decimal128(_) => FieldKind::Other("Decimal128"),
        Bson::DateTime(_) => FieldKind::Other("DateTime"),
        Bson::ObjectId(_) => FieldKind::Other("ObjectId"),
        Bson::Binary(_) => FieldKind::Other("Binary"),
        Bson::Symbol(_) => FieldKind::Other("Symbol"),
        Bson::RegularExpression(_) => FieldKind::Other("Regex"),
        Bson::Timestamp(_) => FieldKind::Other("Timestamp"),
        Bson::JavaScriptCode(_) => FieldKind::Other("JavaScriptCode"),
        Bson::JavaScriptCodeWithScope(_) => FieldKind::Other("JavaScriptCodeWithScope"),
        Bson::DbPointer(_) => FieldKind::Other("DbPointer"),
        Bson::MinKey => FieldKind::Other("MinKey"),
        Bson::MaxKey => FieldKind::Other("MaxKey"),
    }
}

fn format_scalar(value: &Bson) -> String {
    match value {
        Bson::String(s) => s.clone(),
        Bson::Boolean(b) => b.to_string(),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        Bson::Double(f) => {
            if f.is_finite() {
                format!("{f}")
            } else {
                format!("Double({f})")
            }
        }
        Bson::Decimal128(d) => format!("Decimal128(\"{d}\")"),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(iso) => iso,
            Err(_) => format!("DateTime({})", dt.timestamp_millis()),
        },
        Bson::ObjectId(oid) => format!("ObjectId(\"{oid}\")"),
        Bson::Binary(bin) => format!("Binary(len={}, subtype={:?})", bin.bytes.len(), bin.subtype),
        Bson::Symbol(sym) => format!("Symbol({sym:?})"),
        Bson::RegularExpression(regex) => {
            if regex.options.is_empty() {
                format!("Regex({:?})", regex.pattern)
            } else {
                format!("Regex({:?}, {:?})", regex.pattern, regex.options)
            }
        }
        Bson::Timestamp(ts) => format!("Timestamp(time={}, increment={})", ts.time, ts.increment),
        Bson::JavaScriptCode(code) => format!("Code({code:?})"),
        Bson::JavaScriptCodeWithScope(code) => {
            format!("CodeWithScope({:?}, scope_fields={})", code.code, code.scope.len())
        }
        Bson::DbPointer(ptr) => format!("DbPointer({ptr:?})"),
        Bson::Null => String::from("null"),
        Bson::Undefined => String::from("undefined"),
        Bson::MinKey => String::from("MinKey"),
        Bson::MaxKey => String::from("MaxKey"),
        Bson::Document(_) => String::from("Object"),
        Bson::Array(_) => String::from("Array"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::{doc, oid::ObjectId};

    #[test]
    fn fields_are_sorted_by_name() {
        let summary = DocSummary::from_document(&doc! { "x": "hi", "_id": 1, "b": true });
        assert_eq!(summary.field_names(), vec!["_id", "b", "x"]);
    }

    #[test]
    fn containers_display_their_type_tag() {
        let summary = DocSummary::from_document(&doc! { "nested": { "a": 1 }, "list": [1, 2] });
        let list = &summary.fields[0];
        assert_eq!(list.kind, FieldKind::Array);
        assert_eq!(list.value, "Array");
        let nested = &summary.fields[1];
        assert_eq!(nested.kind, FieldKind::Object);
        assert_eq!(nested.value, "Object");
    }

    #[test]
    fn scalars_keep_their_string_form() {
        let summary = DocSummary::from_document(&doc! {
            "count": 3_i64,
            "missing": null,
            "price": 2.5,
            "title": "hi",
        });
        let kinds: Vec<_> = summary.fields.iter().map(|f| (f.kind.clone(), f.value.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (FieldKind::Int, "3"),
                (FieldKind::Null, "null"),
                (FieldKind::Double, "2.5"),
                (FieldKind::String, "hi"),
            ]
        );
    }

    #[test]
    fn other_scalars_are_tagged_by_driver_type() {
        let oid = ObjectId::parse_str("64b7f0c2a1b2c3d4e5f60718").expect("valid oid");
        let summary = DocSummary::from_document(&doc! { "_id": oid });
        assert_eq!(summary.fields[0].kind, FieldKind::Other("ObjectId"));
        assert_eq!(summary.fields[0].value, "ObjectId(\"64b7f0c2a1b2c3d4e5f60718\")");
    }

    #[test]
    fn one_line_joins_fields() {
        let summary = DocSummary::from_document(&doc! { "x": "hi", "_id": 1 });
        assert_eq!(summary.one_line(), "_id: 1  x: hi");
    }
}
