//! Thin wrapper around a sendmail-compatible binary.
//!
//! The binary is run with no arguments and receives the complete message
//! (headers included) on stdin. Any executable following the same
//! convention, e.g. `catchmail`, can stand in for `sendmail`.

use std::{
    io::{self, Write},
    process::{Command, ExitStatus, Stdio},
    thread,
};

use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_BINARY: &str = "sendmail";

#[derive(Debug, Error)]
pub enum SendmailError {
    #[error("cannot run '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },

    #[error("'{binary}' exited with {status}: {stderr}")]
    Exit {
        binary: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("i/o with '{binary}' failed: {source}")]
    Io {
        binary: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Sendmail {
    binary: String,
}

impl Default for Sendmail {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Sendmail {
    /// `None` selects [`DEFAULT_BINARY`].
    pub fn new(binary: Option<String>) -> Self {
        Self { binary: binary.unwrap_or_else(|| DEFAULT_BINARY.to_string()) }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Feed `message` to the binary and return everything it wrote to stdout.
    ///
    /// Blocks until the process exits. A non-zero exit status is an error.
    pub fn send(&self, message: &[u8]) -> Result<Vec<u8>, SendmailError> {
        debug!(binary = %self.binary, bytes = message.len(), "invoking sendmail");

        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SendmailError::Spawn { binary: self.binary.clone(), source })?;

        // Written from a separate thread so a child filling its stdout pipe
        // before draining stdin cannot deadlock us.
        let writer = child.stdin.take().map(|mut stdin| {
            let input = message.to_vec();
            thread::spawn(move || stdin.write_all(&input))
        });

        let output = child
            .wait_with_output()
            .map_err(|source| SendmailError::Io { binary: self.binary.clone(), source })?;

        if let Some(handle) = writer {
            match handle.join() {
                Ok(Ok(())) => {}
                // The child exited without reading everything; its status decides.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(source)) => {
                    return Err(SendmailError::Io { binary: self.binary.clone(), source });
                }
                Err(_) => {
                    return Err(SendmailError::Io {
                        binary: self.binary.clone(),
                        source: io::Error::other("stdin writer thread panicked"),
                    });
                }
            }
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(binary = %self.binary, status = %output.status, %stderr, "sendmail failed");
            return Err(SendmailError::Exit {
                binary: self.binary.clone(),
                status: output.status,
                stderr,
            });
        }

        debug!(binary = %self.binary, stdout_bytes = output.stdout.len(), "sendmail done");
        Ok(output.stdout)
    }
}
