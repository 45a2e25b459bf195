use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A required field was empty. Raised before any request is sent.
    #[error("{0}")]
    Validation(String),
    #[error("network: {0}")]
    Network(String),
    #[error("service returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Service { status: u16, detail: Option<String> },
    #[error("another request of this kind is still in flight")]
    Busy,
    #[error("No call SID available.")]
    MissingCallSid,
    /// The response arrived after a newer state transition and was dropped.
    #[error("response superseded by a newer request")]
    Superseded,
    #[error("{0}")]
    Rejected(String),
    /// The write went through but the follow-up re-fetch failed.
    #[error("saved, but refresh failed: {0}")]
    Resync(Box<ClientError>),
    #[error("storage: {0}")]
    Storage(String),
}

impl ClientError {
    pub fn service(status: u16, detail: Option<String>) -> Self {
        ClientError::Service { status, detail }
    }

    /// Human readable text for status lines.
    pub fn detail(&self) -> String {
        match self {
            ClientError::Network(msg) => msg.clone(),
            ClientError::Service { status, detail } => detail
                .clone()
                .unwrap_or_else(|| format!("HTTP {}", status)),
            ClientError::Resync(inner) => inner.detail(),
            other => other.to_string(),
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(e: toml::de::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(e: toml::ser::Error) -> Self {
        ClientError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ClientError::service(status.as_u16(), None),
            None => ClientError::Network(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_detail_prefers_backend_text() {
        let e = ClientError::service(400, Some("busy".into()));
        assert_eq!(e.detail(), "busy");
        let e = ClientError::service(502, None);
        assert_eq!(e.detail(), "HTTP 502");
    }

    #[test]
    fn resync_reports_inner_detail() {
        let e = ClientError::Resync(Box::new(ClientError::Network("timed out".into())));
        assert_eq!(e.detail(), "timed out");
        assert!(!e.is_network());
    }
}
