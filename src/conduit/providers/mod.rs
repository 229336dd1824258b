//! Conduit client implementations.
//!
//! `build(config, params)` is the factory — called once per registration.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod http;

use crate::conduit::{ConduitClient, ConduitError, ConduitParams};
use crate::config::ConduitConfig;

/// Construct a `ConduitClient` bound to `params` using the configured backend.
pub fn build(config: &ConduitConfig, params: &ConduitParams) -> Result<ConduitClient, ConduitError> {
    match config.backend.as_str() {
        "http" => {
            let c = http::HttpConduit::new(params, config.timeout_seconds)?;
            Ok(ConduitClient::Http(c))
        }
        "dummy" => Ok(ConduitClient::Dummy(dummy::DummyConduit::accepting())),
        _ => Err(ConduitError::UnknownBackend(config.backend.clone())),
    }
}
