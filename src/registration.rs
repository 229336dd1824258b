//! Registering a new Phabricator instance with arcyd.
//!
//! Order of operations:
//!   1. Validate the request (name charset, values renderable)
//!   2. Refuse if `phabricator-{name}.config` already exists
//!   3. Ping Conduit with the supplied credentials
//!   4. Render and create the config file (exclusive create)
//!
//! Nothing touches the network before step 2 passes, and nothing touches
//! the disk unless step 3 passes.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::conduit::{self, ConduitClient, ConduitError, ConduitParams};
use crate::config::ConduitConfig;
use crate::instance::{self, InstanceConfig};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("{} already exists", path.display())]
    Conflict { path: PathBuf },

    #[error("cannot reach phabricator: {0}")]
    Connectivity(#[from] ConduitError),

    #[error("invalid registration: {0}")]
    Validation(String),

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// User-supplied parameters for one `add-phabricator` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// `[A-Za-z0-9_]+`; selects the artifact file name.
    pub name: String,
    pub config: InstanceConfig,
}

impl RegistrationRequest {
    pub fn new(name: impl Into<String>, config: InstanceConfig) -> Self {
        Self { name: name.into(), config }
    }

    pub fn validate(&self) -> Result<(), RegistrationError> {
        instance::validate_name(&self.name)?;
        self.config.validate()
    }
}

/// Creates instance config artifacts under one base directory.
#[derive(Debug, Clone)]
pub struct Registrar {
    base_dir: PathBuf,
    conduit: ConduitConfig,
}

impl Registrar {
    pub fn new(base_dir: impl Into<PathBuf>, conduit: ConduitConfig) -> Self {
        Self { base_dir: base_dir.into(), conduit }
    }

    /// Register `request` using the configured Conduit backend.
    /// Returns the path of the created artifact.
    pub fn register(&self, request: &RegistrationRequest) -> Result<PathBuf, RegistrationError> {
        self.register_with(request, |params| conduit::providers::build(&self.conduit, params))
    }

    /// Same as [`register`](Self::register) with an explicit client factory.
    /// `connect` is called at most once, and only after the uniqueness check.
    pub fn register_with<F>(&self, request: &RegistrationRequest, connect: F) -> Result<PathBuf, RegistrationError>
    where
        F: FnOnce(&ConduitParams) -> Result<ConduitClient, ConduitError>,
    {
        request.validate()?;

        let path = instance::config_path(&self.base_dir, &request.name);
        info!(
            name = %request.name,
            instance_uri = %request.config.instance_uri,
            arcyd_user = %request.config.arcyd_user,
            https_proxy = request.config.https_proxy.is_some(),
            path = %path.display(),
            "registering phabricator instance"
        );

        match path.try_exists() {
            Ok(false) => {}
            Ok(true) => {
                warn!(path = %path.display(), "instance config already exists");
                return Err(RegistrationError::Conflict { path });
            }
            Err(source) => return Err(RegistrationError::Io { path, source }),
        }

        let params = request.config.conduit_params();
        connect(&params)
            .and_then(|client| client.ping())
            .inspect_err(|e| error!(instance_uri = %params.uri, error = %e, "conduit ping failed"))?;

        let content = request.config.render();
        write_new_file(&path, &content)?;

        info!(path = %path.display(), "phabricator instance registered");
        Ok(path)
    }
}

/// Create `path` and write `content`, failing if the file already exists.
///
/// On a write failure after creation the file is removed again so readers
/// never see a truncated artifact.
fn write_new_file(path: &Path, content: &str) -> Result<(), RegistrationError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            warn!(path = %path.display(), "instance config appeared during registration");
            return Err(RegistrationError::Conflict { path: path.to_path_buf() });
        }
        Err(source) => return Err(RegistrationError::Io { path: path.to_path_buf(), source }),
    };

    let written = file.write_all(content.as_bytes()).and_then(|()| file.sync_all());
    if let Err(source) = written {
        drop(file);
        if let Err(e) = fs::remove_file(path) {
            error!(path = %path.display(), error = %e, "cannot remove partial instance config");
        }
        return Err(RegistrationError::Io { path: path.to_path_buf(), source });
    }
    Ok(())
}
