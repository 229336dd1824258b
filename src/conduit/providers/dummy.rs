//! Dummy Conduit backend — answers `ping()` without touching the network.
//! Used for offline setups and for exercising the registration workflow in tests.

use crate::conduit::ConduitError;

#[derive(Debug, Clone, Default)]
pub struct DummyConduit {
    reject: Option<String>,
}

impl DummyConduit {
    pub fn accepting() -> Self {
        Self { reject: None }
    }

    /// Every `ping()` fails with `Rejected` carrying `info`.
    pub fn rejecting(info: impl Into<String>) -> Self {
        Self { reject: Some(info.into()) }
    }

    pub fn ping(&self) -> Result<(), ConduitError> {
        match &self.reject {
            None => Ok(()),
            Some(info) => Err(ConduitError::Rejected {
                code: "ERR-DUMMY".to_string(),
                info: info.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepting_pings_ok() {
        assert!(DummyConduit::accepting().ping().is_ok());
    }

    #[test]
    fn rejecting_pings_err() {
        let err = DummyConduit::rejecting("no route to host").ping().unwrap_err();
        assert!(err.to_string().contains("no route to host"));
    }
}
