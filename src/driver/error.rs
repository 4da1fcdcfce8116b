/// Errors surfaced by the driver layer.
///
/// `Lock` is only ever returned under the strict lock policy; weak locks
/// swallow the failure before it reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Session negotiation failed: {0}")]
    Negotiation(String),

    #[error("Lock failed: {0}")]
    Lock(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Handle is not connected")]
    NotConnected,

    #[error("Unknown driver: {0}")]
    UnknownDriver(String),

    #[error("Not supported: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// True for errors that leave the handle unusable until reconnect.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::Connection(_) | DriverError::Negotiation(_) | DriverError::NotConnected
        )
    }

    /// Message carried by the error, without the category prefix.
    pub fn message(&self) -> String {
        match self {
            DriverError::Connection(m)
            | DriverError::Negotiation(m)
            | DriverError::Lock(m)
            | DriverError::Query(m)
            | DriverError::UnknownDriver(m)
            | DriverError::Unsupported(m) => m.clone(),
            DriverError::NotConnected => "handle is not connected".to_string(),
        }
    }
}
