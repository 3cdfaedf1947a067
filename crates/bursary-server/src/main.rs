//! Bursary server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and serves the JSON API over HTTP.
//!
//! # Admin bootstrap
//!
//! On first start an admin credential can be seeded from config:
//!
//! ```toml
//! admin_email         = "admin@example.com"
//! admin_password_hash = "$argon2id$..."
//! ```
//!
//! Generate the hash with:
//!
//! ```
//! cargo run -p bursary-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use bursary_api::{AppState, AuthKeys, api_router};
use bursary_core::{
  admin::UserRole,
  store::{Credential, PlatformStore},
  verification::School,
};
use bursary_store_sqlite::SqliteStore;
use clap::Parser;
use rand_core::OsRng;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Bursary donation platform server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host:                String,
  #[serde(default = "default_port")]
  port:                u16,
  /// Path to the SQLite database file.
  store_path:          PathBuf,
  /// Secret used to sign bearer tokens.
  auth_secret:         String,
  /// Optional admin account seeded on first start.
  admin_email:         Option<String>,
  admin_password_hash: Option<String>,
  /// Optional JSON file with the school reference list.
  schools_path:        Option<PathBuf>,
}

fn default_host() -> String {
  "127.0.0.1".into()
}

fn default_port() -> u16 {
  8080
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

  // Helper mode: hash a password and exit.
  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("BURSARY"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  seed_schools(&store, server_cfg.schools_path.as_deref()).await;
  bootstrap_admin(&store, &server_cfg).await;

  let state = AppState {
    store: Arc::new(store),
    auth:  Arc::new(AuthKeys::new(server_cfg.auth_secret.as_bytes().to_vec())),
  };

  let app = api_router(state).layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Entry in the schools JSON file.
#[derive(Debug, Deserialize)]
struct SchoolEntry {
  name:  String,
  city:  String,
  state: String,
}

/// Seed the school reference list from `schools_path`, if configured.
/// Seeding is idempotent; failures are logged and do not abort startup.
async fn seed_schools(store: &SqliteStore, path: Option<&Path>) {
  let Some(path) = path else { return };
  let entries: Vec<SchoolEntry> = match std::fs::read_to_string(path)
    .map_err(anyhow::Error::from)
    .and_then(|text| serde_json::from_str(&text).map_err(Into::into))
  {
    Ok(entries) => entries,
    Err(e) => {
      tracing::warn!("failed to read schools file {path:?}: {e}");
      return;
    }
  };

  let schools = entries
    .into_iter()
    .map(|e| School {
      school_id: Uuid::new_v4(),
      name:      e.name,
      city:      e.city,
      state:     e.state,
    })
    .collect::<Vec<_>>();

  let count = schools.len();
  match store.seed_schools(schools).await {
    Ok(()) => tracing::info!("seeded {count} schools"),
    Err(e) => tracing::warn!("school seeding failed: {e}"),
  }
}

/// Seed the configured admin credential. A credential that already exists
/// is left alone.
async fn bootstrap_admin(store: &SqliteStore, cfg: &ServerConfig) {
  let (Some(email), Some(hash)) =
    (cfg.admin_email.as_ref(), cfg.admin_password_hash.as_ref())
  else {
    return;
  };

  match store.get_credential(email, UserRole::Admin).await {
    Ok(Some(_)) => return,
    Ok(None) => {}
    Err(e) => {
      tracing::warn!("admin bootstrap lookup failed: {e}");
      return;
    }
  }

  let result = store
    .add_credential(Credential {
      user_id:       Uuid::new_v4(),
      email:         email.clone(),
      password_hash: hash.clone(),
      role:          UserRole::Admin,
    })
    .await;
  match result {
    Ok(_) => tracing::info!("seeded admin credential for {email}"),
    Err(e) => tracing::warn!("admin bootstrap failed: {e}"),
  }
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

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
