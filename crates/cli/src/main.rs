//! Ashpazkhoone CLI - data file management tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the data file with default settings and sample categories
//! ak-cli init
//!
//! # Create an admin user
//! ak-cli admin create -e admin@example.com -n "Admin Name" -p "a long password"
//!
//! # Reset a forgotten password
//! ak-cli admin password -e admin@example.com -p "a new long password"
//!
//! # Back up and restore the whole database
//! ak-cli backup -o backup.json
//! ak-cli restore -i backup.json
//!
//! # Rewrite stored settings in the current shape
//! ak-cli settings migrate
//!
//! # Mirror the catalog into a client-side directory store and back
//! ak-cli local export --dir ./local --prefix ak_
//! ak-cli local import --dir ./local --prefix ak_
//! ```
//!
//! Every command works on the file named by `--data-file` or `AK_DATA_FILE`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod error;

use error::CliError;

#[derive(Parser)]
#[command(name = "ak-cli")]
#[command(author, version, about = "Ashpazkhoone CLI tools")]
struct Cli {
    /// JSON data file
    #[arg(long, global = true, env = "AK_DATA_FILE", default_value = "data/db.json")]
    data_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data file with default settings and sample categories
    Init {
        /// Overwrite an existing data file
        #[arg(long)]
        force: bool,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Write the whole database to a backup file
    Backup {
        /// Output file (defaults to a timestamped name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace the database with a backup file
    Restore {
        /// Backup file to read
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Site settings maintenance
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Copy data between the data file and a client-side directory store
    Local {
        #[command(subcommand)]
        action: LocalAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Admin email address
        #[arg(short, long)]
        email: String,

        /// Admin display name
        #[arg(short, long)]
        name: String,

        /// Admin password
        #[arg(short, long, env = "AK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Set a new password for an existing account
    Password {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New password
        #[arg(short, long, env = "AK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Rewrite stored settings in the current schema version
    Migrate,
}

#[derive(Subcommand)]
enum LocalAction {
    /// Write catalog, orders and settings into the store
    Export {
        /// Store directory
        #[arg(long)]
        dir: PathBuf,

        /// Key prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
    /// Read catalog, orders and settings back from the store
    Import {
        /// Store directory
        #[arg(long)]
        dir: PathBuf,

        /// Key prefix
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() {
    // .env values feed clap's `env` fallbacks
    dotenvy::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ak_cli=info,ashpazkhoone_api=info,ashpazkhoone_core=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let data_file = cli.data_file;
    match cli.command {
        Commands::Init { force } => commands::data::init(&data_file, force).await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                email,
                name,
                password,
            } => {
                commands::admin::create_user(&data_file, &email, &name, password.into()).await?;
            }
            AdminAction::Password { email, password } => {
                commands::admin::set_password(&data_file, &email, password.into()).await?;
            }
        },
        Commands::Backup { output } => {
            commands::data::backup(&data_file, output.as_deref()).await?;
        }
        Commands::Restore { input } => commands::data::restore(&data_file, &input).await?,
        Commands::Settings { action } => match action {
            SettingsAction::Migrate => {
                commands::data::migrate_settings(&data_file).await?;
            }
        },
        Commands::Local { action } => match action {
            LocalAction::Export { dir, prefix } => {
                commands::local::export(&data_file, &dir, &prefix).await?;
            }
            LocalAction::Import { dir, prefix } => {
                commands::local::import(&data_file, &dir, &prefix).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    async fn run_args(data_file: &std::path::Path, args: &[&str]) -> Result<(), CliError> {
        let mut argv = vec!["ak-cli", "--data-file", data_file.to_str().unwrap()];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv).unwrap()).await
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[tokio::test]
    async fn test_commands_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let backup = dir.path().join("backup.json");
        let store = dir.path().join("local");

        run_args(&path, &["init"]).await.unwrap();
        run_args(&path, &["settings", "migrate"]).await.unwrap();
        run_args(
            &path,
            &["admin", "create", "-e", "owner@example.com", "-n", "Owner", "-p", "a long enough password"],
        )
        .await
        .unwrap();
        run_args(
            &path,
            &["admin", "password", "-e", "owner@example.com", "-p", "another long password"],
        )
        .await
        .unwrap();
        run_args(&path, &["backup", "-o", backup.to_str().unwrap()])
            .await
            .unwrap();
        run_args(&path, &["restore", "-i", backup.to_str().unwrap()])
            .await
            .unwrap();
        run_args(&path, &["local", "export", "--dir", store.to_str().unwrap()])
            .await
            .unwrap();
        run_args(&path, &["local", "import", "--dir", store.to_str().unwrap()])
            .await
            .unwrap();

        assert!(matches!(
            run_args(&path, &["init"]).await,
            Err(CliError::AlreadyInitialized(_))
        ));
    }
}
