mod cards;
mod cli;
mod config;
mod storage;

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use fieldseal_core::store::{Column, ColumnType, ContainerSchema, RecordStore, Value};
use fieldseal_storage::{
    field_cipher::{FieldCipher, FieldKey},
    key_provider::encode_key,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        cli::Command::Demo(args) => cards::run_demo(args, &config).await?,
        cli::Command::Encrypt { plaintext } => {
            let cipher = storage::cipher_from_config(&config).await?;
            println!("{}", cipher.encrypt(&plaintext)?);
        }
        cli::Command::Decrypt { envelope } => {
            let cipher = storage::cipher_from_config(&config).await?;
            println!("{}", cipher.decrypt(envelope.trim())?);
        }
        cli::Command::Card(cmd) => cards::handle(cmd, &config).await?,
        cli::Command::Keygen => println!("{}", encode_key(&FieldKey::generate())),
        cli::Command::Health => run_health_check(&config).await?,
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info to avoid noisy stdout.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("fieldseal {}", env!("CARGO_PKG_VERSION"));
}

/// Runs a quick health check of the cipher and the configured store.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let store = storage::connect(config)?;
    let cipher = storage::cipher_from_config(config).await?;
    run_store_health(store.as_ref(), &cipher).await?;
    println!("Storage: ok ({})", store.name());
    Ok(())
}

const HEALTH_CONTAINER: &str = "health_check";
const HEALTH_VALUE_COLUMN: &str = "value";

fn health_schema() -> ContainerSchema {
    ContainerSchema::new(
        HEALTH_CONTAINER,
        vec![
            Column::new("id", ColumnType::Integer),
            Column::new(HEALTH_VALUE_COLUMN, ColumnType::String),
        ],
        true,
    )
}

async fn run_store_health(store: &dyn RecordStore, cipher: &FieldCipher) -> Result<()> {
    let payload = "ok";
    let container = store
        .define_schema(health_schema())
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    let value_index = container
        .schema()
        .column_index(HEALTH_VALUE_COLUMN)
        .ok_or_else(|| {
            color_eyre::eyre::eyre!("{HEALTH_CONTAINER} has no {HEALTH_VALUE_COLUMN} column")
        })?;
    container
        .insert(vec![Value::Integer(0), Value::String(cipher.encrypt(payload)?)])
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    let row = container
        .query_all()
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?
        .find(|row| row.first() == Some(&Value::Integer(0)))
        .ok_or_else(|| color_eyre::eyre::eyre!("health row missing after insert"))?;
    let envelope = row
        .get(value_index)
        .and_then(Value::as_str)
        .ok_or_else(|| color_eyre::eyre::eyre!("health row has no envelope"))?;

    if cipher.decrypt(envelope)? != payload {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
