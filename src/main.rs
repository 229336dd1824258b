//! arcyd admin entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load settings
//!   4. Resolve effective log level (CLI `-v` flags > RUST_LOG > settings)
//!   5. Init logger once
//!   6. Run the requested command

use std::io::{self, Read, Write};

use clap::Parser;
use tracing::info;

use arcyd::cli::{Cli, Commands};
use arcyd::config::{self, Config};
use arcyd::error::AppError;
use arcyd::instance::InstanceConfig;
use arcyd::logger;
use arcyd::registration::{Registrar, RegistrationRequest};
use arcyd::sendmail::Sendmail;

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    let cli_level = logger::verbosity_level(cli.verbose);
    let effective_log_level = cli_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, cli_level.is_some())?;

    info!(
        work_dir = %config.work_dir.display(),
        conduit_backend = %config.conduit.backend,
        sendmail_binary = %config.mail.sendmail_binary,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    match cli.command {
        Commands::AddPhabricator(args) => add_phabricator(&config, args.into()),
        Commands::ShowPhabricator { name } => show_phabricator(&config, &name),
        Commands::SendMail { binary } => send_mail(&config, binary),
    }
}

fn add_phabricator(config: &Config, request: RegistrationRequest) -> Result<(), AppError> {
    let registrar = Registrar::new(config.work_dir.clone(), config.conduit.clone());
    let path = registrar.register(&request)?;
    println!("{}", path.display());
    Ok(())
}

fn show_phabricator(config: &Config, name: &str) -> Result<(), AppError> {
    let instance = InstanceConfig::load(&config.work_dir, name)?;
    println!("name:         {name}");
    println!("instance-uri: {}", instance.instance_uri);
    println!("arcyd-user:   {}", instance.arcyd_user);
    println!("arcyd-cert:   <redacted>");
    if let Some(proxy) = &instance.https_proxy {
        println!("https-proxy:  {proxy}");
    }
    Ok(())
}

fn send_mail(config: &Config, binary: Option<String>) -> Result<(), AppError> {
    let mut message = Vec::new();
    io::stdin().read_to_end(&mut message)?;

    let sendmail = Sendmail::new(Some(binary.unwrap_or_else(|| config.mail.sendmail_binary.clone())));
    let output = sendmail.send(&message)?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(&output)?;
    stdout.flush()?;
    Ok(())
}
