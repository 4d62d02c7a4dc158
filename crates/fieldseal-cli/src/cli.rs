use clap::{Args, Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "fieldseal",
    about = "Field-level encryption for sensitive record columns",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store one card with a sealed number, then read every card back.
    Demo(DemoArgs),
    /// Seal a single value and print the envelope.
    Encrypt { plaintext: String },
    /// Open a single envelope and print the value.
    Decrypt { envelope: String },
    /// Manage stored cards.
    #[command(subcommand)]
    Card(CardCommand),
    /// Print a fresh base64 field key.
    Keygen,
    /// Round-trip a sample value through the cipher and the configured store.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DemoArgs {
    #[arg(long, default_value_t = 1)]
    pub id: i64,
    #[arg(long, default_value = "4731324241234123")]
    pub card: String,
    #[arg(long, default_value = "12/2028")]
    pub expires: String,
    #[arg(long, default_value = "Saif Eddine")]
    pub owner: String,
    /// Use a throwaway in-memory store instead of the configured one.
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum CardCommand {
    /// Store a card, replacing any card with the same id.
    Add {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        number: String,
        #[arg(long)]
        expires: String,
        #[arg(long)]
        owner: String,
    },
    /// List stored cards with their numbers opened.
    List,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
