use color_eyre::Result;
use fieldseal_core::{
    cards::{CardNumber, CardRepository, CardView, CreditCard},
    store::{InMemoryStore, RecordStore},
};
use fieldseal_records::SealedCardRepo;
use fieldseal_storage::field_cipher::FieldCipher;
use tracing::{info, warn};

use crate::{
    cli::{CardCommand, DemoArgs},
    config, storage,
};

/// Execute a card subcommand against the configured store.
pub async fn handle(cmd: CardCommand, config: &config::Config) -> Result<()> {
    let store = storage::connect(config)?;
    let cipher = storage::cipher_from_config(config).await?;
    let repo = SealedCardRepo::connect(store.as_ref(), cipher)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    match cmd {
        CardCommand::Add {
            id,
            number,
            expires,
            owner,
        } => {
            let card = CreditCard {
                id,
                card_number: number,
                expiration_date: expires,
                owner_name: owner,
            };
            repo.save(&card)
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            println!("Stored card {id} for {}", card.owner_name);
        }
        CardCommand::List => {
            let cards = repo
                .list()
                .await
                .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            if cards.is_empty() {
                println!("No cards yet. Add one with `fieldseal card add`.");
                return Ok(());
            }
            for card in &cards {
                for line in render_card(card) {
                    println!("{line}");
                }
            }
        }
    }

    Ok(())
}

/// Store one card and print every stored card, decrypting the card number.
pub async fn run_demo(args: DemoArgs, config: &config::Config) -> Result<()> {
    let store: Box<dyn RecordStore> = if args.ephemeral {
        Box::new(InMemoryStore::new())
    } else {
        storage::connect(config)?
    };
    let cipher = storage::cipher_from_config(config).await?;
    for line in demo_lines(store.as_ref(), cipher, args).await? {
        println!("{line}");
    }
    Ok(())
}

async fn demo_lines(
    store: &dyn RecordStore,
    cipher: FieldCipher,
    args: DemoArgs,
) -> Result<Vec<String>> {
    info!(store = store.name(), "running card demo");
    let repo = SealedCardRepo::connect(store, cipher)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    let card = CreditCard {
        id: args.id,
        card_number: args.card,
        expiration_date: args.expires,
        owner_name: args.owner,
    };
    let envelope = repo
        .save(&card)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("failed to store card: {e}"))?;

    let mut lines = vec![format!("Encrypted Credit Card Number: {envelope}")];
    let cards = repo
        .list()
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
    for view in &cards {
        lines.extend(render_card(view));
    }
    Ok(lines)
}

/// Lines printed for one card; an unreadable number is reported and the other columns still shown.
pub fn render_card(card: &CardView) -> Vec<String> {
    let number = match &card.card_number {
        CardNumber::Revealed(number) => format!("Decrypted Credit Card Number: {number}"),
        CardNumber::Unreadable { reason } => {
            warn!(id = card.id, "skipping card number: {reason}");
            format!("Decrypted Credit Card Number: <unavailable: {reason}>")
        }
    };
    vec![
        format!("Card {}", card.id),
        number,
        format!("Expiration Date: {}", card.expiration_date),
        format!("Owner Name: {}", card.owner_name),
    ]
}
