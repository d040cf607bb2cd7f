//! Pulse CLI - operator commands
//!
//! Usage:
//!   pulse create-admin --username <name> --email <email> [--password <pw>]
//!   pulse hash-password [<password>]
//!   pulse generate-secret [--bytes <n>]
//!   pulse migrate
//!   pulse sweep

use anyhow::{bail, Context};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use clap::{Parser, Subcommand};
use pulse_api::audit::{audit_log, AuditEvent};
use pulse_api::auth::{hash_password, validate_password_strength, TokenBlacklist};
use pulse_api::logging::init_tracing;
use pulse_core::models::roles;
use pulse_core::store::{connect, PgBlacklistStore, PgUserStore};
use pulse_core::{bounded, AppConfig, Clock, NewUser, SystemClock, UserStore};
use rand::{rngs::OsRng, RngCore};
use std::io::BufRead;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "Pulse authentication service operator tool")]
#[command(version)]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, env = "PULSE_CONFIG", global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the administrator account unless the email already exists
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Print the Argon2 hash of a password
    HashPassword {
        /// Read from stdin when omitted
        password: Option<String>,
    },
    /// Print a random signing secret for JWT_SECRET_KEY
    GenerateSecret {
        #[arg(long, default_value_t = 48)]
        bytes: usize,
    },
    /// Apply database migrations
    Migrate,
    /// Delete expired blacklist entries once
    Sweep,
}

fn load_config(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

/// First line of `input`, without the line terminator
fn read_secret_line(input: impl BufRead) -> anyhow::Result<String> {
    let line = input
        .lines()
        .next()
        .transpose()
        .context("failed to read password")?
        .unwrap_or_default();
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn password_from(arg: Option<String>) -> anyhow::Result<String> {
    match arg {
        Some(password) => Ok(password),
        None => {
            eprintln!("Password (read from stdin):");
            read_secret_line(std::io::stdin().lock())
        }
    }
}

fn generate_secret(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    URL_SAFE_NO_PAD.encode(buf)
}

async fn create_admin(
    config: &AppConfig,
    username: String,
    email: String,
    password: Option<String>,
) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    if username.trim().is_empty() || email.is_empty() {
        bail!("username and email must not be empty");
    }

    let password = password_from(password)?;
    if let Err(reason) = validate_password_strength(&password) {
        bail!(reason);
    }
    let password_hash = hash_password(&password, &config.auth.password)?;

    let pool = connect(&config.database).await?;
    pulse_core::migrate::migrate(&pool).await?;
    let users = PgUserStore::from_pool(pool.clone());

    let ensured = bounded(
        config.blacklist.store_timeout(),
        users.ensure_user(NewUser {
            username: username.trim().to_string(),
            email: email.clone(),
            password_hash,
            role: roles::ADMIN.to_string(),
        }),
    )
    .await?;

    audit_log(&AuditEvent::AdminBootstrap {
        email: email.clone(),
        created: ensured.created,
    });

    if ensured.created {
        println!("Created admin {} ({})", ensured.principal.username, email);
    } else {
        println!("User {} already exists, nothing changed", email);
    }

    pool.close().await;
    Ok(())
}

async fn sweep(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(&config.database).await?;
    let blacklist = TokenBlacklist::new(
        Arc::new(PgBlacklistStore::from_pool(pool.clone())),
        config.blacklist.store_timeout(),
    );

    let removed = blacklist.sweep(SystemClock.now()).await?;
    audit_log(&AuditEvent::BlacklistSweep { removed });
    println!("Removed {removed} expired blacklist entries");

    pool.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging);

    match cli.command {
        Commands::CreateAdmin {
            username,
            email,
            password,
        } => create_admin(&config, username, email, password).await?,
        Commands::HashPassword { password } => {
            let password = password_from(password)?;
            println!("{}", hash_password(&password, &config.auth.password)?);
        }
        Commands::GenerateSecret { bytes } => {
            if bytes < pulse_core::config::MIN_SECRET_LEN {
                bail!(
                    "secret must be at least {} bytes",
                    pulse_core::config::MIN_SECRET_LEN
                );
            }
            println!("{}", generate_secret(bytes));
        }
        Commands::Migrate => {
            let pool = connect(&config.database).await?;
            pulse_core::migrate::migrate(&pool).await?;
            println!("Migrations applied");
            pool.close().await;
        }
        Commands::Sweep => sweep(&config).await?,
    }

    Ok(())
}
