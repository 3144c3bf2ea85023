//! placement-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered with
//! `PLACEMENT_*` environment variables, opens an in-process SQLite store,
//! and serves the JSON API under `/api`.
//!
//! # Bootstrapping an admin
//!
//! Admins cannot self-register. Create the first one from the command line:
//!
//! ```
//! cargo run -p placement-server -- create-admin --name "Registrar" --email admin@uni.edu
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use placement_core::Portal;
use placement_server::{ServerConfig, app, expand_tilde, seed::seed, state};
use placement_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Placement portal server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Create an admin account. The password is read from stdin if omitted.
  CreateAdmin {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    email:    String,
    #[arg(long)]
    password: Option<String>,
  },
  /// Load demo accounts and a sample posting.
  Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::CreateAdmin {
      name,
      email,
      password,
    } => {
      let password = match password {
        Some(p) => p,
        None => read_password()?,
      };
      let admin = Portal::new(Arc::new(store))
        .create_admin(name, email, password)
        .await
        .context("failed to create admin")?;
      println!("created admin {} ({})", admin.email, admin.user_id);
      Ok(())
    }
    Command::Seed => {
      let report = seed(&Portal::new(Arc::new(store)))
        .await
        .context("failed to seed demo data")?;
      for line in &report.accounts {
        println!("{line}");
      }
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let app = app(state(store, server_cfg));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
