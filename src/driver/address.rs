use crate::dialects::base::{EngineDescriptor, SqlFamily};
use crate::driver::{ConnectParams, DriverError};
use crate::executor::OdbcSettings;

/// Where a client/server engine listens, parsed from the configured host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAddress {
    Tcp { host: String, port: Option<u16> },
    Socket { host: String, path: String },
}

/// Parse `host`, `host:port`, `host:/path/to.sock` or `[v6addr]:port`.
/// A non-numeric segment after `:` is a socket path.
pub fn parse_host(host: &str) -> Result<HostAddress, DriverError> {
    let host = host.trim();

    let (name, suffix) = if let Some(rest) = host.strip_prefix('[') {
        let (inner, after) = rest.split_once(']').ok_or_else(|| {
            DriverError::Connection(format!("Unterminated IPv6 address: {}", host))
        })?;
        (inner, after.strip_prefix(':').unwrap_or(after))
    } else {
        host.split_once(':').unwrap_or((host, ""))
    };
    let name = if name.is_empty() { "localhost" } else { name };

    if suffix.is_empty() {
        return Ok(HostAddress::Tcp {
            host: name.to_string(),
            port: None,
        });
    }

    if suffix.chars().all(|c| c.is_ascii_digit()) {
        let port = suffix
            .parse::<u16>()
            .map_err(|_| DriverError::Connection(format!("Invalid port: {}", suffix)))?;
        Ok(HostAddress::Tcp {
            host: name.to_string(),
            port: Some(port),
        })
    } else {
        Ok(HostAddress::Socket {
            host: name.to_string(),
            path: suffix.to_string(),
        })
    }
}

/// Brace an attribute value when it carries ODBC delimiters.
fn odbc_value(value: &str) -> String {
    let needs_braces = value.contains([';', '{', '}', '='])
        || value.starts_with(' ')
        || value.ends_with(' ');
    if needs_braces {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}

/// ODBC connection string for a client/server engine.
pub fn odbc_connection_string(
    engine: &EngineDescriptor,
    params: &ConnectParams,
    settings: &OdbcSettings,
) -> Result<String, DriverError> {
    let address = parse_host(&params.host)?;

    let mut parts = Vec::new();
    match engine.family {
        SqlFamily::Mysql => {
            parts.push(format!("Driver={{{}}}", settings.mysql_driver));
            match address {
                HostAddress::Tcp { host, port } => {
                    parts.push(format!("Server={}", odbc_value(&host)));
                    parts.push(format!("Port={}", port.unwrap_or(3306)));
                }
                HostAddress::Socket { host, path } => {
                    parts.push(format!("Server={}", odbc_value(&host)));
                    parts.push(format!("Socket={}", odbc_value(&path)));
                }
            }
        }
        SqlFamily::Postgresql => {
            parts.push(format!("Driver={{{}}}", settings.postgres_driver));
            match address {
                HostAddress::Tcp { host, port } => {
                    parts.push(format!("Server={}", odbc_value(&host)));
                    parts.push(format!("Port={}", port.unwrap_or(5432)));
                }
                HostAddress::Socket { path, .. } => {
                    return Err(DriverError::Connection(format!(
                        "Socket addresses are only supported for MySQL: {}",
                        path
                    )));
                }
            }
        }
        SqlFamily::Sqlite => {
            return Err(DriverError::Unsupported(format!(
                "{} does not connect through ODBC",
                engine.name
            )));
        }
    }

    parts.push(format!("Database={}", odbc_value(&params.database)));
    parts.push(format!("Uid={}", odbc_value(&params.user)));
    parts.push(format!("Pwd={}", odbc_value(params.password())));
    if engine.family == SqlFamily::Mysql {
        parts.push(format!("Charset={}", engine.charset.name()));
    }

    Ok(parts.join(";") + ";")
}
