// Library root — exposes the registration workflow and mail transport for
// integration tests and other arcyd tools. The binary entry point is src/main.rs.

pub mod cli;
pub mod conduit;
pub mod config;
pub mod error;
pub mod instance;
pub mod logger;
pub mod registration;
pub mod sendmail;
