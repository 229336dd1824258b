//! Command-line surface of the `arcyd` binary.

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::instance::InstanceConfig;
use crate::registration::RegistrationRequest;

#[derive(Parser, Debug)]
#[command(name = "arcyd", version, about = "Arcyd admin: phabricator instances and mail")]
pub struct Cli {
    #[arg(
        short = 'f',
        long = "config",
        global = true,
        value_name = "PATH",
        help = "Settings file (default: config/default.toml)"
    )]
    pub config: Option<String>,
    #[arg(
        short,
        long,
        global = true,
        action = ArgAction::Count,
        help = "Increase logging verbosity (-v warn, -vv info, -vvv debug, -vvvv trace)"
    )]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Make a new phabricator instance known to arcyd.
    AddPhabricator(AddPhabricatorArgs),
    /// Print a registered instance, certificate redacted.
    ShowPhabricator {
        #[arg(long, value_name = "STR", help = "string name of the phabricator instance")]
        name: String,
    },
    /// Pipe a message from stdin through the sendmail binary.
    SendMail {
        #[arg(long, value_name = "NAME", help = "sendmail-compatible binary to run instead of the configured one")]
        binary: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct AddPhabricatorArgs {
    #[arg(long, value_name = "STR", help = "string name of the phabricator instance, [_a-zA-Z0-9]+")]
    pub name: String,
    #[arg(
        long,
        value_name = "ADDRESS",
        help = "URI to use to access the conduit API, e.g. 'http://127.0.0.1/api/'"
    )]
    pub instance_uri: String,
    #[arg(long, value_name = "USERNAME", help = "username of admin account registered for arcyd to use")]
    pub arcyd_user: String,
    #[arg(
        long,
        value_name = "CERT",
        help = "Phabricator Conduit API certificate to use, found at \
                http://your.server.example/settings/panel/conduit/ or in ~/.arcrc"
    )]
    pub arcyd_cert: String,
    #[arg(
        long,
        value_name = "ADDRESS",
        help = "(OPTIONAL) proxy URI for arcyd to use when connecting to conduit over https"
    )]
    pub https_proxy: Option<String>,
}

impl From<AddPhabricatorArgs> for RegistrationRequest {
    fn from(args: AddPhabricatorArgs) -> Self {
        RegistrationRequest::new(
            args.name,
            InstanceConfig::new(args.instance_uri, args.arcyd_user, args.arcyd_cert, args.https_proxy),
        )
    }
}
