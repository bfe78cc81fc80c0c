//! CourseHub CLI - run and administer the account service.

mod commands;
mod ui;

use clap::{Parser, Subcommand, ValueEnum};
use coursehub_core::config::LogFormat;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "coursehub")]
#[command(about = "CourseHub - account and session service")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format (defaults to settings.logFormat)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormatArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway operations
    Gateway {
        #[command(subcommand)]
        action: GatewayCommands,
    },

    /// Identity management against the local data directory
    Admin {
        #[command(subcommand)]
        action: AdminCommands,

        /// Data directory override
        #[arg(long, global = true)]
        data_dir: Option<std::path::PathBuf>,
    },
}

#[derive(Subcommand)]
enum GatewayCommands {
    /// Start the gateway server
    Run {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Bind address (loopback, lan, or IP)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Check gateway status
    Status,
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Create an identity
    Create {
        /// Email address
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Password (or use --generate-password; prompted when neither is given)
        #[arg(long)]
        password: Option<String>,

        /// Generate a random password
        #[arg(long, conflicts_with = "password")]
        generate_password: bool,

        /// Role: user or admin
        #[arg(long, default_value = "admin")]
        role: String,
    },

    /// List all identities
    List,

    /// Change an identity's role
    SetRole {
        /// Email of the identity
        #[arg(long)]
        email: String,

        /// Role: user or admin
        #[arg(long)]
        role: String,
    },

    /// Delete an identity
    Delete {
        /// Email of the identity
        #[arg(long)]
        email: String,
    },
}

fn init_logging(verbose: bool, format: Option<LogFormatArg>) {
    let settings = coursehub_core::Config::load_default()
        .map(|c| c.settings)
        .unwrap_or_default();

    let default_level = if verbose || settings.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let json = match format {
        Some(LogFormatArg::Json) => true,
        Some(LogFormatArg::Pretty) => false,
        None => settings.log_format == LogFormat::Json,
    };

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(false))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Gateway { action } => {
            let action = match action {
                GatewayCommands::Run { port, bind } => {
                    commands::gateway::GatewayAction::Run { port, bind }
                }
                GatewayCommands::Status => commands::gateway::GatewayAction::Status,
            };
            commands::run_gateway(commands::gateway::GatewayArgs { action }).await?;
        }

        Commands::Admin { action, data_dir } => {
            let args = commands::admin::AdminArgs {
                action: match action {
                    AdminCommands::Create {
                        email,
                        name,
                        password,
                        generate_password,
                        role,
                    } => commands::admin::AdminAction::Create {
                        email,
                        name,
                        password,
                        generate_password,
                        role,
                    },
                    AdminCommands::List => commands::admin::AdminAction::List,
                    AdminCommands::SetRole { email, role } => {
                        commands::admin::AdminAction::SetRole { email, role }
                    }
                    AdminCommands::Delete { email } => {
                        commands::admin::AdminAction::Delete { email }
                    }
                },
                data_dir,
            };
            commands::run_admin(args)?;
        }
    }

    Ok(())
}
