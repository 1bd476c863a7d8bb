/// Core error type for the relay.
///
/// Adapter crates map their specific errors into this type so the driver can
/// tell a fatal failure (stop the process) from a soft one (log and move on).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("delivery error: {0}")]
    Delivery(String),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Only configuration problems stop the relay; everything else is retried
    /// by the next cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_errors_are_fatal() {
        assert!(Error::Config("TEAM_NAME".to_string()).is_fatal());
        assert!(!Error::Upstream("timeout".to_string()).is_fatal());
        assert!(!Error::Delivery("chat not found".to_string()).is_fatal());
        assert!(!Error::External("boom".to_string()).is_fatal());
        assert!(!Error::Io(std::io::Error::other("disk")).is_fatal());
    }
}
