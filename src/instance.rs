//! Phabricator instance config artifacts.
//!
//! One file per registered instance, named `phabricator-{name}.config` and
//! stored under the arcyd work dir. The body is an argument list with one
//! flag or one value per line, so it can be fed straight back to an
//! argument parser:
//!
//! ```text
//! --instance-uri
//! http://127.0.0.1/api/
//! --arcyd-user
//! alice
//! --arcyd-cert
//! CERTVALUE
//! --https-proxy            (only when a proxy is configured)
//! http://proxy.example:8080
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::conduit::ConduitParams;
use crate::registration::RegistrationError;

const FLAG_INSTANCE_URI: &str = "--instance-uri";
const FLAG_ARCYD_USER: &str = "--arcyd-user";
const FLAG_ARCYD_CERT: &str = "--arcyd-cert";
const FLAG_HTTPS_PROXY: &str = "--https-proxy";

/// `phabricator-{name}.config`. No validation of `name`.
pub fn config_file_name(name: &str) -> String {
    format!("phabricator-{name}.config")
}

/// Location of the artifact for `name` under `base_dir`.
pub fn config_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(config_file_name(name))
}

/// Instance names are restricted to `[A-Za-z0-9_]+` so they can never
/// escape the base directory.
pub fn validate_name(name: &str) -> Result<(), RegistrationError> {
    if name.is_empty() {
        return Err(RegistrationError::Validation("instance name must not be empty".into()));
    }
    if let Some(bad) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_')) {
        return Err(RegistrationError::Validation(format!(
            "instance name '{name}' contains '{bad}'; expected [A-Za-z0-9_]+"
        )));
    }
    Ok(())
}

/// Connection settings for one Phabricator instance — the artifact's content.
#[derive(Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub instance_uri: String,
    pub arcyd_user: String,
    pub arcyd_cert: String,
    /// `None` means a direct connection. Never `Some("")`.
    pub https_proxy: Option<String>,
}

impl std::fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("instance_uri", &self.instance_uri)
            .field("arcyd_user", &self.arcyd_user)
            .field("arcyd_cert", &"<redacted>")
            .field("https_proxy", &self.https_proxy)
            .finish()
    }
}

impl InstanceConfig {
    pub fn new(
        instance_uri: impl Into<String>,
        arcyd_user: impl Into<String>,
        arcyd_cert: impl Into<String>,
        https_proxy: Option<String>,
    ) -> Self {
        Self {
            instance_uri: instance_uri.into(),
            arcyd_user: arcyd_user.into(),
            arcyd_cert: arcyd_cert.into(),
            https_proxy: https_proxy.filter(|p| !p.is_empty()),
        }
    }

    /// Required values must be non-empty; no value may contain a line break,
    /// since the file format has no escaping.
    pub fn validate(&self) -> Result<(), RegistrationError> {
        let required = [
            (FLAG_INSTANCE_URI, &self.instance_uri),
            (FLAG_ARCYD_USER, &self.arcyd_user),
            (FLAG_ARCYD_CERT, &self.arcyd_cert),
        ];
        for (flag, value) in required {
            if value.is_empty() {
                return Err(RegistrationError::Validation(format!("{flag} must not be empty")));
            }
        }
        let proxy = self.proxy().map(|p| (FLAG_HTTPS_PROXY, p));
        let all = required
            .into_iter()
            .map(|(flag, value)| (flag, value.as_str()))
            .chain(proxy);
        for (flag, value) in all {
            if value.contains(['\n', '\r']) {
                return Err(RegistrationError::Validation(format!(
                    "{flag} value must not contain line breaks"
                )));
            }
        }
        Ok(())
    }

    /// The proxy to use, if any. An empty value counts as no proxy.
    pub fn proxy(&self) -> Option<&str> {
        self.https_proxy.as_deref().filter(|p| !p.is_empty())
    }

    pub fn conduit_params(&self) -> ConduitParams {
        ConduitParams::new(
            self.instance_uri.clone(),
            self.arcyd_user.clone(),
            self.arcyd_cert.clone(),
            self.proxy().map(str::to_string),
        )
    }

    /// Render the artifact body. Deterministic; no trailing newline.
    pub fn render(&self) -> String {
        let mut lines = vec![
            FLAG_INSTANCE_URI,
            self.instance_uri.as_str(),
            FLAG_ARCYD_USER,
            self.arcyd_user.as_str(),
            FLAG_ARCYD_CERT,
            self.arcyd_cert.as_str(),
        ];
        if let Some(proxy) = self.proxy() {
            lines.push(FLAG_HTTPS_PROXY);
            lines.push(proxy);
        }
        lines.join("\n")
    }

    /// Parse an artifact body produced by [`render`](Self::render).
    ///
    /// A single trailing newline is tolerated (`\r\n` too).
    pub fn parse(text: &str) -> Result<Self, RegistrationError> {
        let malformed = |reason: String| RegistrationError::Validation(format!("malformed instance config: {reason}"));

        let body = text
            .strip_suffix("\r\n")
            .or_else(|| text.strip_suffix('\n'))
            .unwrap_or(text);

        let mut instance_uri = None;
        let mut arcyd_user = None;
        let mut arcyd_cert = None;
        let mut https_proxy = None;

        let mut lines = body.lines();
        while let Some(flag) = lines.next() {
            let slot = match flag {
                FLAG_INSTANCE_URI => &mut instance_uri,
                FLAG_ARCYD_USER => &mut arcyd_user,
                FLAG_ARCYD_CERT => &mut arcyd_cert,
                FLAG_HTTPS_PROXY => &mut https_proxy,
                other => return Err(malformed(format!("unexpected line '{other}'"))),
            };
            let value = lines
                .next()
                .ok_or_else(|| malformed(format!("{flag} has no value")))?;
            if slot.replace(value.to_string()).is_some() {
                return Err(malformed(format!("{flag} given more than once")));
            }
        }

        let config = Self::new(
            instance_uri.ok_or_else(|| malformed(format!("missing {FLAG_INSTANCE_URI}")))?,
            arcyd_user.ok_or_else(|| malformed(format!("missing {FLAG_ARCYD_USER}")))?,
            arcyd_cert.ok_or_else(|| malformed(format!("missing {FLAG_ARCYD_CERT}")))?,
            https_proxy,
        );
        config.validate()?;
        Ok(config)
    }

    /// Read and parse `phabricator-{name}.config` from `base_dir`.
    pub fn load(base_dir: &Path, name: &str) -> Result<Self, RegistrationError> {
        validate_name(name)?;
        let path = config_path(base_dir, name);
        let text = fs::read_to_string(&path)
            .map_err(|source| RegistrationError::Io { path: path.clone(), source })?;
        Self::parse(&text)
    }
}
