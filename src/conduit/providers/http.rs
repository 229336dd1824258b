//! HTTP Conduit backend (`conduit.connect` handshake, then `conduit.ping`).
//!
//! Conduit methods are called by POSTing form fields to `{api}/{method}`:
//! `params` (JSON), `output=json` and `__conduit__=1`. Every reply is a JSON
//! envelope `{"result": …, "error_code": …, "error_info": …}`; a non-null
//! `error_code` means the server refused the call.
//!
//! Certificate auth: `conduit.connect` takes the user, a unix-time
//! `authToken` and `authSignature = sha1_hex(authToken + cert)`, and answers
//! with a session. The ping then carries that session under `__conduit__`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client;
use reqwest::{Proxy, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use sha1::{Digest, Sha1};
use tracing::{debug, error};

use crate::conduit::{ConduitError, ConduitParams};

const CONNECT_METHOD: &str = "conduit.connect";
const PING_METHOD: &str = "conduit.ping";
const CLIENT_NAME: &str = "arcyd";
const CLIENT_VERSION: u32 = 1;
const CLIENT_DESCRIPTION: &str = "arcyd instance registration";

/// Blocking client bound to one instance and one set of credentials.
///
/// Only the proxy given in `ConduitParams` is used; environment proxy
/// variables are ignored so the persisted config fully describes the route.
#[derive(Debug, Clone)]
pub struct HttpConduit {
    client: Client,
    api: Url,
    user: String,
    cert: String,
}

/// Session returned by `conduit.connect`.
#[derive(Debug, Deserialize)]
struct Session {
    #[serde(rename = "sessionKey")]
    session_key: String,
    #[serde(rename = "connectionID")]
    connection_id: u64,
}

impl HttpConduit {
    /// `timeout_seconds = None` disables the request timeout entirely.
    pub fn new(params: &ConduitParams, timeout_seconds: Option<u64>) -> Result<Self, ConduitError> {
        let api = api_base(&params.uri)?;

        let mut builder = Client::builder()
            .timeout(timeout_seconds.map(Duration::from_secs))
            .no_proxy();
        if let Some(proxy) = &params.https_proxy {
            let p = Proxy::https(proxy.as_str()).map_err(|e| ConduitError::InvalidProxy {
                proxy: proxy.clone(),
                reason: e.to_string(),
            })?;
            builder = builder.proxy(p);
        }
        let client = builder
            .build()
            .map_err(|e| ConduitError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api,
            user: params.user.clone(),
            cert: params.cert.clone(),
        })
    }

    /// Authenticate as `user` with the certificate, then ping on that session.
    pub fn ping(&self) -> Result<(), ConduitError> {
        let session = self.connect()?;
        let params = json!({
            "__conduit__": {
                "sessionKey": session.session_key,
                "connectionID": session.connection_id,
            }
        });
        let result = self.call(PING_METHOD, &params)?;
        debug!(?result, "conduit ping ok");
        Ok(())
    }

    fn connect(&self) -> Result<Session, ConduitError> {
        let auth_token = unix_now();
        let params = json!({
            "client": CLIENT_NAME,
            "clientVersion": CLIENT_VERSION,
            "clientDescription": CLIENT_DESCRIPTION,
            "user": self.user,
            "host": self.api.as_str(),
            "authToken": auth_token,
            "authSignature": auth_signature(auth_token, &self.cert),
        });

        debug!(api = %self.api, user = %self.user, "opening conduit session");
        let result = self.call(CONNECT_METHOD, &params)?;
        serde_json::from_value(result)
            .map_err(|e| ConduitError::Response(format!("unexpected {CONNECT_METHOD} result: {e}")))
    }

    /// POST one method call and unwrap the envelope into its `result`.
    fn call(&self, method: &str, params: &Value) -> Result<Value, ConduitError> {
        let endpoint = self.api.join(method).map_err(|e| ConduitError::InvalidUri {
            uri: self.api.to_string(),
            reason: e.to_string(),
        })?;
        let form = [
            ("params", params.to_string()),
            ("output", "json".to_string()),
            ("__conduit__", "1".to_string()),
        ];

        let response = self
            .client
            .post(endpoint.clone())
            .form(&form)
            .send()
            .map_err(|e| {
                error!(%endpoint, error = %e, "conduit request failed (transport)");
                ConduitError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            error!(%endpoint, %status, "conduit returned HTTP error");
            return Err(ConduitError::Status { status: status.as_u16(), body });
        }

        let envelope = response
            .json::<ConduitEnvelope>()
            .map_err(|e| ConduitError::Response(format!("failed to parse {method} response: {e}")))?;

        if let Some(code) = envelope.error_code {
            return Err(ConduitError::Rejected {
                code,
                info: envelope.error_info.unwrap_or_default(),
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ConduitEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_info: Option<String>,
}

/// `sha1_hex(token + cert)`, the signature `conduit.connect` checks.
pub fn auth_signature(auth_token: u64, cert: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(auth_token.to_string().as_bytes());
    hasher.update(cert.as_bytes());
    hex::encode(hasher.finalize())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

/// Parse the api uri, adding a trailing slash so methods join beneath it.
fn api_base(uri: &str) -> Result<Url, ConduitError> {
    let invalid = |reason: String| ConduitError::InvalidUri { uri: uri.to_string(), reason };

    let base = if uri.ends_with('/') {
        Url::parse(uri)
    } else {
        Url::parse(&format!("{uri}/"))
    }
    .map_err(|e| invalid(e.to_string()))?;

    if base.scheme() != "http" && base.scheme() != "https" {
        return Err(invalid(format!("unsupported scheme '{}'", base.scheme())));
    }
    Ok(base)
}
