use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;

const SCHEME: &str = "mongodb://";
const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 27017;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("--password requires --username")]
    PasswordWithoutUsername,
    #[error("--sspiHostnameCanonicalization must be `none` or `forward`, got `{0}`")]
    InvalidCanonicalization(String),
}

/// Terminal browser for a MongoDB deployment.
#[derive(Debug, Default, Parser)]
#[command(name = "mongotui", version, about)]
pub struct Cli {
    /// Host (`host[:port]`) or full connection string (`mongodb://...`).
    pub target: Option<String>,

    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,

    #[arg(short = 'u', long)]
    pub username: Option<String>,
    #[arg(short = 'p', long)]
    pub password: Option<String>,
    #[arg(long = "authenticationDatabase")]
    pub authentication_database: Option<String>,
    #[arg(long = "authenticationMechanism")]
    pub authentication_mechanism: Option<String>,
    #[arg(long = "awsIamSessionToken")]
    pub aws_iam_session_token: Option<String>,
    #[arg(long = "gssApiServiceName")]
    pub gss_api_service_name: Option<String>,
    #[arg(long = "sspiHostnameCanonicalization")]
    pub sspi_hostname_canonicalization: Option<String>,
    #[arg(long = "sspiRealmOverride")]
    pub sspi_realm_override: Option<String>,

    #[arg(long)]
    pub tls: bool,
    #[arg(long = "tlsCertificateKeyFile")]
    pub tls_certificate_key_file: Option<String>,
    #[arg(long = "tlsCertificateKeyFilePassword")]
    pub tls_certificate_key_file_password: Option<String>,
    #[arg(long = "tlsCAFile")]
    pub tls_ca_file: Option<String>,
    #[arg(long = "tlsAllowInvalidHostnames")]
    pub tls_allow_invalid_hostnames: bool,
    #[arg(long = "tlsAllowInvalidCertificates")]
    pub tls_allow_invalid_certificates: bool,
    #[arg(long = "tlsCertificateSelector")]
    pub tls_certificate_selector: Option<String>,
    #[arg(long = "tlsCRLFile")]
    pub tls_crl_file: Option<String>,
    #[arg(long = "tlsDisabledProtocols")]
    pub tls_disabled_protocols: Option<String>,
    #[arg(long = "tlsFIPSMode")]
    pub tls_fips_mode: bool,

    /// Settings file (default: ./mongotui.toml).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Builds the connection string handed to the driver. `timeout` becomes
    /// the server-selection and connect timeouts unless the target sets them.
    pub fn connection_uri(&self, timeout: Duration) -> Result<String, ArgumentError> {
        if self.password.is_some() && self.username.is_none() {
            return Err(ArgumentError::PasswordWithoutUsername);
        }

        let target = self.target.as_deref().map(str::trim).filter(|target| !target.is_empty());
        let mut uri = match target {
            Some(target) if target.contains("://") => target.to_string(),
            _ => {
                let host = self.host.as_deref().or(target).unwrap_or(DEFAULT_HOST);
                format!("{SCHEME}{}", self.address(host))
            }
        };

        if let Some(username) = &self.username {
            inject_credentials(&mut uri, username, self.password.as_deref());
        }

        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(database) = &self.authentication_database {
            params.push(("authSource", database.clone()));
        }
        if let Some(mechanism) = &self.authentication_mechanism {
            params.push(("authMechanism", mechanism.clone()));
        }
        let properties = self.mechanism_properties()?;
        if !properties.is_empty() {
            params.push(("authMechanismProperties", properties.join(",")));
        }
        if self.tls {
            params.push(("tls", String::from("true")));
        }
        if let Some(file) = &self.tls_certificate_key_file {
            params.push(("tlsCertificateKeyFile", file.clone()));
        }
        if let Some(password) = &self.tls_certificate_key_file_password {
            params.push(("tlsCertificateKeyFilePassword", password.clone()));
        }
        if let Some(file) = &self.tls_ca_file {
            params.push(("tlsCAFile", file.clone()));
        }
        if self.tls_allow_invalid_hostnames {
            params.push(("tlsAllowInvalidHostnames", String::from("true")));
        }
        if self.tls_allow_invalid_certificates {
            params.push(("tlsAllowInvalidCertificates", String::from("true")));
        }

        let lowered = uri.to_ascii_lowercase();
        let millis = timeout.as_millis().to_string();
        if !lowered.contains("serverselectiontimeoutms=") {
            params.push(("serverSelectionTimeoutMS", millis.clone()));
        }
        if !lowered.contains("connecttimeoutms=") {
            params.push(("connectTimeoutMS", millis));
        }

        append_query(&mut uri, &params);
        Ok(uri)
    }

    /// TLS flags accepted for compatibility that the driver has no setting for.
    pub fn ignored_options(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if self.tls_certificate_selector.is_some() {
            ignored.push("tlsCertificateSelector");
        }
        if self.tls_crl_file.is_some() {
            ignored.push("tlsCRLFile");
        }
        if self.tls_disabled_protocols.is_some() {
            ignored.push("tlsDisabledProtocols");
        }
        if self.tls_fips_mode {
            ignored.push("tlsFIPSMode");
        }
        ignored
    }

    /// `host[:port]`, with `--port` taking precedence over a port in `host`.
    fn address(&self, host: &str) -> String {
        let (host, path) = match host.split_once('/') {
            Some((host, path)) => (host, format!("/{path}")),
            None => (host, String::new()),
        };
        let (name, embedded_port) = match host.rsplit_once(':') {
            Some((name, port)) => match port.parse::<u16>() {
                Ok(port) => (name, Some(port)),
                Err(_) => (host, None),
            },
            None => (host, None),
        };
        let port = self.port.or(embedded_port).unwrap_or(DEFAULT_PORT);
        format!("{name}:{port}{path}")
    }

    fn mechanism_properties(&self) -> Result<Vec<String>, ArgumentError> {
        let mut properties = Vec::new();
        if let Some(token) = &self.aws_iam_session_token {
            properties.push(format!("AWS_SESSION_TOKEN:{token}"));
        }
        if let Some(service) = &self.gss_api_service_name {
            properties.push(format!("SERVICE_NAME:{service}"));
        }
        match self.sspi_hostname_canonicalization.as_deref() {
            None | Some("none") => {}
            Some("forward") => properties.push(String::from("CANONICALIZE_HOST_NAME:true")),
            Some(other) => return Err(ArgumentError::InvalidCanonicalization(other.to_string())),
        }
        if let Some(realm) = &self.sspi_realm_override {
            properties.push(format!("SERVICE_REALM:{realm}"));
        }
        Ok(properties)
    }
}

fn authority_bounds(uri: &str) -> (usize, usize) {
    let start = uri.find("://").map(|index| index + 3).unwrap_or(0);
    let end = uri[start..].find(['/', '?']).map(|index| start + index).unwrap_or(uri.len());
    (start, end)
}

fn inject_credentials(uri: &mut String, username: &str, password: Option<&str>) {
    let (start, end) = authority_bounds(uri);
    if uri[start..end].contains('@') {
        log::warn!("connection string already carries credentials; ignoring --username");
        return;
    }

    let mut credentials = percent_encode(username);
    if let Some(password) = password {
        credentials.push(':');
        credentials.push_str(&percent_encode(password));
    }
    credentials.push('@');
    uri.insert_str(start, &credentials);
}

fn append_query(uri: &mut String, params: &[(&str, String)]) {
    if params.is_empty() {
        return;
    }

    if uri.contains('?') {
        if !uri.ends_with('?') && !uri.ends_with('&') {
            uri.push('&');
        }
    } else {
        let (_, end) = authority_bounds(uri);
        if end == uri.len() {
            uri.push('/');
        }
        uri.push('?');
    }

    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", escape_query_value(value)))
        .collect::<Vec<_>>()
        .join("&");
    uri.push_str(&query);
}

fn percent_encode(input: &str) -> String {
    input
        .bytes()
        .map(|byte| match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (byte as char).to_string()
            }
            _ => format!("%{:02X}", byte),
        })
        .collect()
}

/// Escapes only what would break the query string itself; the driver reads
/// paths and mechanism properties (`KEY:value,KEY:value`) literally.
fn escape_query_value(input: &str) -> String {
    input
        .bytes()
        .map(|byte| match byte {
            b'&' | b'#' | b'%' | b'?' | b' ' | 0x80..=0xFF => format!("%{:02X}", byte),
            _ => (byte as char).to_string(),
        })
        .collect()
}
