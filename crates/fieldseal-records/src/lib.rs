use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use fieldseal_core::{
    cards::{credit_card_schema, CardNumber, CardRepository, CardView, CreditCard, SealedCardRow},
    store::{Container, RecordStore},
};
use fieldseal_storage::field_cipher::FieldCipher;
use tracing::{instrument, warn};

/// Card repository over a record store container. The card number column is
/// sealed with a [`FieldCipher`]; every other column is stored as given.
pub struct SealedCardRepo {
    container: Arc<dyn Container>,
    cipher: FieldCipher,
}

impl SealedCardRepo {
    /// Define the card container on `store` (idempotent) and wrap it.
    pub async fn connect<S: RecordStore + ?Sized>(store: &S, cipher: FieldCipher) -> Result<Self> {
        let container = store
            .define_schema(credit_card_schema())
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Self::new(container, cipher)
    }

    /// Wrap an existing container; it must carry the card schema.
    pub fn new(container: Arc<dyn Container>, cipher: FieldCipher) -> Result<Self> {
        if container.schema() != &credit_card_schema() {
            anyhow::bail!(
                "container {} does not have the card layout",
                container.schema().name
            );
        }
        Ok(Self { container, cipher })
    }

    fn open_row(&self, row: SealedCardRow) -> CardView {
        let card_number = match self.cipher.decrypt(&row.envelope) {
            Ok(number) => CardNumber::Revealed(number),
            Err(err) => {
                warn!(id = row.id, error = %err, "card number could not be decrypted");
                CardNumber::Unreadable {
                    reason: err.to_string(),
                }
            }
        };

        CardView {
            id: row.id,
            card_number,
            expiration_date: row.expiration_date,
            owner_name: row.owner_name,
        }
    }
}

#[async_trait]
impl CardRepository for SealedCardRepo {
    #[instrument(skip_all, fields(id = card.id))]
    async fn save(&self, card: &CreditCard) -> Result<String> {
        let envelope = self
            .cipher
            .encrypt(&card.card_number)
            .context("card number encryption failed")?;

        let row = SealedCardRow {
            id: card.id,
            envelope: envelope.clone(),
            expiration_date: card.expiration_date.clone(),
            owner_name: card.owner_name.clone(),
        };
        self.container
            .insert(row.into_row())
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(envelope)
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<CardView>> {
        let rows = self
            .container
            .query_all()
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        rows.map(|row| -> Result<CardView> {
            let sealed = SealedCardRow::from_row(row)?;
            Ok(self.open_row(sealed))
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use fieldseal_core::store::{Column, ColumnType, ContainerSchema, InMemoryStore, Value};
    use fieldseal_storage::field_cipher::FieldKey;

    use super::*;

    fn sample_card() -> CreditCard {
        CreditCard {
            id: 1,
            card_number: "4731324241234123".into(),
            expiration_date: "12/2028".into(),
            owner_name: "Saif Eddine".into(),
        }
    }

    fn cipher() -> FieldCipher {
        FieldCipher::new(FieldKey::new(*b"1324151512412414"))
    }

    #[tokio::test]
    async fn saves_and_lists_cards() {
        let store = InMemoryStore::new();
        let repo = SealedCardRepo::connect(&store, cipher())
            .await
            .expect("connect");

        let envelope = repo.save(&sample_card()).await.expect("save");
        assert!(envelope.len() >= 44);

        let cards = repo.list().await.expect("list");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, 1);
        assert_eq!(cards[0].card_number.revealed(), Some("4731324241234123"));
        assert_eq!(cards[0].expiration_date, "12/2028");
        assert_eq!(cards[0].owner_name, "Saif Eddine");
    }

    #[tokio::test]
    async fn stored_row_holds_envelope_not_plaintext() {
        let store = InMemoryStore::new();
        let repo = SealedCardRepo::connect(&store, cipher())
            .await
            .expect("connect");
        let envelope = repo.save(&sample_card()).await.expect("save");

        let container = store
            .define_schema(credit_card_schema())
            .await
            .expect("define");
        let row = container.query_all().await.expect("query").next().expect("row");
        assert_eq!(row[1], Value::String(envelope));
        assert_ne!(row[1], Value::String("4731324241234123".into()));
        assert_eq!(row[2], Value::String("12/2028".into()));
    }

    #[tokio::test]
    async fn wrong_key_marks_only_the_card_number() {
        let store = InMemoryStore::new();
        let writer = SealedCardRepo::connect(&store, cipher())
            .await
            .expect("connect");
        writer.save(&sample_card()).await.expect("save");

        let other_key = FieldCipher::new(FieldKey::new(*b"0000000000000000"));
        let reader = SealedCardRepo::connect(&store, other_key)
            .await
            .expect("connect");
        let cards = reader.list().await.expect("list still succeeds");
        assert_eq!(cards.len(), 1);
        assert_ne!(cards[0].card_number.revealed(), Some("4731324241234123"));
        assert_eq!(cards[0].owner_name, "Saif Eddine");
    }

    #[tokio::test]
    async fn corrupted_envelope_is_reported_per_card() {
        let store = InMemoryStore::new();
        let repo = SealedCardRepo::connect(&store, cipher())
            .await
            .expect("connect");
        repo.save(&sample_card()).await.expect("save");

        let container = store
            .define_schema(credit_card_schema())
            .await
            .expect("define");
        container
            .insert(vec![
                Value::Integer(2),
                Value::String("not-base64!!".into()),
                Value::String("01/2030".into()),
                Value::String("Someone Else".into()),
            ])
            .await
            .expect("insert raw row");

        let cards = repo.list().await.expect("list");
        assert_eq!(cards.len(), 2);
        assert!(cards[0].card_number.revealed().is_some());
        assert!(matches!(
            cards[1].card_number,
            CardNumber::Unreadable { .. }
        ));
        assert_eq!(cards[1].owner_name, "Someone Else");
    }

    #[tokio::test]
    async fn rejects_container_without_card_layout() {
        let store = InMemoryStore::new();
        let notes = store
            .define_schema(ContainerSchema::new(
                "notes",
                vec![Column::new("text", ColumnType::String)],
                false,
            ))
            .await
            .expect("define");

        let err = SealedCardRepo::new(notes, cipher())
            .err()
            .expect("foreign container must be refused");
        assert!(err.to_string().contains("notes"));

        let cards = store
            .define_schema(credit_card_schema())
            .await
            .expect("define");
        assert!(SealedCardRepo::new(cards, cipher()).is_ok());
    }

    #[tokio::test]
    async fn saving_same_id_replaces_card() {
        let store = InMemoryStore::new();
        let repo = SealedCardRepo::connect(&store, cipher())
            .await
            .expect("connect");
        repo.save(&sample_card()).await.expect("save");

        let mut updated = sample_card();
        updated.card_number = "5500000000000004".into();
        repo.save(&updated).await.expect("save again");

        let cards = repo.list().await.expect("list");
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].card_number.revealed(), Some("5500000000000004"));
    }
}
