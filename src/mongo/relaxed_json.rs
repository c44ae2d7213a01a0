//! Normalises shell-style filter snippets into JSON before parsing.
//!
//! Bare object keys (`_id`, `$or`, `a.b`) gain double quotes and single-quoted
//! strings are rewritten as double-quoted ones. Text inside double-quoted
//! strings is copied untouched.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleString,
    DoubleString,
}

#[derive(Debug)]
struct PendingKey {
    key: String,
    whitespace: String,
    prev_non_ws: Option<char>,
}

pub fn normalize(input: &str) -> String {
    let mut output = String::with_capacity(input.len() + 8);
    let mut state = ScanState::Normal;
    let mut escape = false;
    let mut pending: Option<PendingKey> = None;
    let mut prev_non_ws: Option<char> = None;

    for ch in input.chars() {
        match state {
            ScanState::DoubleString => {
                output.push(ch);
                if escape {
                    escape = false;
                } else if ch == '\\' {
                    escape = true;
                } else if ch == '"' {
                    state = ScanState::Normal;
                    prev_non_ws = Some('"');
                }
            }
            ScanState::SingleString => {
                if escape {
                    escape = false;
                    // `\'` needs no escape once the string is double-quoted.
                    if ch != '\'' {
                        output.push('\\');
                    }
                    output.push(ch);
                } else if ch == '\\' {
                    escape = true;
                } else if ch == '\'' {
                    output.push('"');
                    state = ScanState::Normal;
                    prev_non_ws = Some('"');
                } else if ch == '"' {
                    output.push_str("\\\"");
                } else {
                    output.push(ch);
                }
            }
            ScanState::Normal => {
                if let Some(mut candidate) = pending.take() {
                    match ch {
                        c if c.is_whitespace() => {
                            candidate.whitespace.push(c);
                            pending = Some(candidate);
                            continue;
                        }
                        ':' => {
                            flush_key(&mut output, &candidate, true);
                            output.push(':');
                            prev_non_ws = Some(':');
                            continue;
                        }
                        c if is_key_char(c) && candidate.whitespace.is_empty() => {
                            candidate.key.push(c);
                            pending = Some(candidate);
                            continue;
                        }
                        _ => {
                            if let Some(last) = flush_key(&mut output, &candidate, false) {
                                prev_non_ws = Some(last);
                            }
                        }
                    }
                }

                match ch {
                    c if c.is_whitespace() => output.push(c),
                    '\'' => {
                        output.push('"');
                        state = ScanState::SingleString;
                        escape = false;
                    }
                    '"' => {
                        output.push('"');
                        state = ScanState::DoubleString;
                        escape = false;
                    }
                    c if is_key_start_char(c) && starts_key(prev_non_ws) => {
                        pending = Some(PendingKey {
                            key: c.to_string(),
                            whitespace: String::new(),
                            prev_non_ws,
                        });
                    }
                    _ => {
                        output.push(ch);
                        prev_non_ws = Some(ch);
                    }
                }
            }
        }
    }

    if let Some(candidate) = pending.take() {
        flush_key(&mut output, &candidate, false);
    }

    output
}

fn flush_key(output: &mut String, candidate: &PendingKey, is_key: bool) -> Option<char> {
    if is_key && starts_key(candidate.prev_non_ws) {
        output.push('"');
        output.push_str(&candidate.key);
        output.push('"');
        output.push_str(&candidate.whitespace);
        Some('"')
    } else {
        output.push_str(&candidate.key);
        output.push_str(&candidate.whitespace);
        candidate.key.chars().last()
    }
}

fn is_key_start_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, '_' | '$')
}

fn is_key_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '$' | '.')
}

fn starts_key(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(ch) => matches!(ch, '{' | ','),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize;

    #[test]
    fn quotes_bare_keys() {
        assert_eq!(normalize("{ key: \"value\" }"), "{ \"key\": \"value\" }");
    }

    #[test]
    fn leaves_valid_json_alone() {
        let input = r#"{"status": "A", "n": {"$gt": 1}}"#;
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn handles_operators_and_nesting() {
        assert_eq!(
            normalize("{$or: [{status: 'A'}, {qty: {$lt: 30}}]}"),
            r#"{"$or": [{"status": "A"}, {"qty": {"$lt": 30}}]}"#
        );
    }

    #[test]
    fn converts_single_quoted_strings() {
        assert_eq!(normalize(r#"{ 'name': 'O\'Brien "x"' }"#), r#"{ "name": "O'Brien \"x\"" }"#);
    }

    #[test]
    fn keeps_colons_inside_strings() {
        assert_eq!(normalize("{ url: \"a:b\", other: 'c:d' }"), r#"{ "url": "a:b", "other": "c:d" }"#);
    }

    #[test]
    fn keeps_literals_unquoted() {
        assert_eq!(normalize("{ done: true, gone: null }"), r#"{ "done": true, "gone": null }"#);
    }

    #[test]
    fn dotted_keys_are_quoted() {
        assert_eq!(normalize("{ a.b: 1 }"), r#"{ "a.b": 1 }"#);
    }

    #[test]
    fn preserves_whitespace_around_colon() {
        assert_eq!(normalize("{  _id  :  1  }"), "{  \"_id\"  :  1  }");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize(""), "");
    }
}
