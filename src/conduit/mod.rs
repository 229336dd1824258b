//! Conduit (Phabricator API) client abstraction.
//!
//! `ConduitClient` is an enum over concrete backends in `providers/`.
//! The registration workflow only needs `ping()`: one check that proves the
//! endpoint is reachable and accepts the supplied user and certificate.

pub mod providers;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConduitError {
    #[error("unknown conduit backend: {0}")]
    UnknownBackend(String),
    #[error("invalid instance uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
    #[error("invalid https proxy '{proxy}': {reason}")]
    InvalidProxy { proxy: String, reason: String },
    #[error("conduit request failed: {0}")]
    Transport(String),
    #[error("conduit returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("conduit response unreadable: {0}")]
    Response(String),
    #[error("conduit rejected request [{code}]: {info}")]
    Rejected { code: String, info: String },
}

// ── Connection parameters ─────────────────────────────────────────────────────

/// Everything needed to reach one Conduit endpoint as one user.
#[derive(Clone, PartialEq, Eq)]
pub struct ConduitParams {
    pub uri: String,
    pub user: String,
    pub cert: String,
    /// `None` means a direct connection.
    pub https_proxy: Option<String>,
}

impl ConduitParams {
    /// An empty proxy string is treated as no proxy.
    pub fn new(
        uri: impl Into<String>,
        user: impl Into<String>,
        cert: impl Into<String>,
        https_proxy: Option<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            user: user.into(),
            cert: cert.into(),
            https_proxy: https_proxy.filter(|p| !p.is_empty()),
        }
    }
}

// Keeps the certificate out of `{:?}` output and therefore out of logs.
impl std::fmt::Debug for ConduitParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConduitParams")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("cert", &"<redacted>")
            .field("https_proxy", &self.https_proxy)
            .finish()
    }
}

// ── Client enum ───────────────────────────────────────────────────────────────

/// All available client backends.
///
/// Enum dispatch avoids `dyn` trait objects. Adding a backend = new module +
/// new variant + new `ping` arm + new `providers::build` arm.
#[derive(Debug, Clone)]
pub enum ConduitClient {
    Http(providers::http::HttpConduit),
    Dummy(providers::dummy::DummyConduit),
}

impl ConduitClient {
    /// Check reachability and credentials. Blocks until the backend answers.
    pub fn ping(&self) -> Result<(), ConduitError> {
        match self {
            ConduitClient::Http(c) => c.ping(),
            ConduitClient::Dummy(c) => c.ping(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_proxy_is_no_proxy() {
        let p = ConduitParams::new("http://host/api/", "bot", "XYZ", Some(String::new()));
        assert_eq!(p.https_proxy, None);
    }

    #[test]
    fn proxy_is_kept_verbatim() {
        let p = ConduitParams::new(
            "http://host/api/",
            "bot",
            "XYZ",
            Some("http://proxy.example:8080".into()),
        );
        assert_eq!(p.https_proxy.as_deref(), Some("http://proxy.example:8080"));
    }

    #[test]
    fn debug_redacts_cert() {
        let p = ConduitParams::new("http://host/api/", "bot", "SECRETCERT", None);
        let dbg = format!("{p:?}");
        assert!(!dbg.contains("SECRETCERT"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn rejected_error_display() {
        let e = ConduitError::Rejected {
            code: "ERR-INVALID-AUTH".into(),
            info: "bad token".into(),
        };
        assert_eq!(e.to_string(), "conduit rejected request [ERR-INVALID-AUTH]: bad token");
    }
}
