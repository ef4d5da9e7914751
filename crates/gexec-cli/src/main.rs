mod access;
mod cli;
mod config;
mod secret;
mod storage;

use clap::Parser;
use color_eyre::{eyre::WrapErr, Result};
use gexec_core::{model::Runner, rows::RowStore};
use gexec_records::{RecordError, SealedRepository};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand};

const PROBE_ID: &str = "health-probe";
const PROBE_TOKEN: &str = "gexec health probe";

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = cli::Cli::parse();
    let config = config::load()?;
    init_tracing(&config.log);

    match cli.command {
        Command::Version => print_version(),
        Command::Health => run_health_check(&config).await?,
        Command::Config(ConfigCommand::Init) => init_config()?,
        Command::Secret(cmd) => secret::handle(cmd, &config)?,
        Command::Access(cmd) => access::handle(cmd)?,
    }

    Ok(())
}

fn init_tracing(log: &config::LogConfig) {
    // RUST_LOG wins over the configured level.
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level));
    let pretty = log.pretty.then(|| {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .with_ansi(log.color)
            .with_writer(std::io::stderr)
    });
    let compact = (!log.pretty).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_ansi(log.color)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty)
        .with(compact)
        .init();
}

fn print_version() {
    println!("gexec {}", env!("CARGO_PKG_VERSION"));
}

/// Validates the passphrase, then round-trips a sealed probe row.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let repo = storage::repository_from_config(config)?;
    println!("Cipher: AES-{}-GCM ok", repo.cipher().bits());
    run_store_health(&repo).await?;
    println!("Storage: ok");
    Ok(())
}

async fn run_store_health<S, C>(repo: &SealedRepository<S, C>) -> Result<()>
where
    S: RowStore,
    C: gexec_core::secret::FieldCipher,
{
    let probe = Runner {
        id: PROBE_ID.to_string(),
        name: "health".to_string(),
        token: PROBE_TOKEN.to_string(),
        ..Default::default()
    };

    // A probe left behind by an interrupted run would block the create.
    match repo.delete::<Runner>(PROBE_ID).await {
        Ok(()) | Err(RecordError::NotFound { .. }) => {}
        Err(err) => return Err(err).wrap_err("failed to clear stale probe"),
    }

    repo.create(probe).await.wrap_err("failed to write probe")?;
    let round_trip: Runner = repo.show(PROBE_ID).await.wrap_err("failed to read probe")?;
    repo.delete::<Runner>(PROBE_ID)
        .await
        .wrap_err("failed to remove probe")?;

    if round_trip.token != PROBE_TOKEN {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    info!("health probe round-tripped");
    Ok(())
}

fn init_config() -> Result<()> {
    let path = config::init_at(&config::default_path()?)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
