use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{Column, ColumnType, ContainerSchema, Row, Value};

/// Name of the container holding card records.
pub const CARD_CONTAINER: &str = "CreditCard";
/// Column holding the sealed card number.
pub const CARD_NUMBER_COLUMN: &str = "cardNumber";

/// Card record as supplied by callers, with the card number in the clear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreditCard {
    pub id: i64,
    pub card_number: String,
    pub expiration_date: String,
    pub owner_name: String,
}

/// Outcome of opening a stored card number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardNumber {
    Revealed(String),
    /// The stored envelope could not be opened; other columns are still usable.
    Unreadable { reason: String },
}

impl CardNumber {
    pub fn revealed(&self) -> Option<&str> {
        match self {
            CardNumber::Revealed(number) => Some(number),
            CardNumber::Unreadable { .. } => None,
        }
    }
}

/// Card record as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: i64,
    pub card_number: CardNumber,
    pub expiration_date: String,
    pub owner_name: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CardError {
    /// A stored row does not have the card layout.
    #[error("malformed card row: {0}")]
    Row(String),
}

/// Fixed schema of the card container. The `id` column is the row key.
pub fn credit_card_schema() -> ContainerSchema {
    ContainerSchema::new(
        CARD_CONTAINER,
        vec![
            Column::new("id", ColumnType::Integer),
            Column::new(CARD_NUMBER_COLUMN, ColumnType::String),
            Column::new("expirationDate", ColumnType::String),
            Column::new("ownerName", ColumnType::String),
        ],
        true,
    )
}

/// Column values of a stored card row, with the card number still sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedCardRow {
    pub id: i64,
    pub envelope: String,
    pub expiration_date: String,
    pub owner_name: String,
}

impl SealedCardRow {
    pub fn into_row(self) -> Row {
        vec![
            Value::Integer(self.id),
            Value::String(self.envelope),
            Value::String(self.expiration_date),
            Value::String(self.owner_name),
        ]
    }

    pub fn from_row(row: Row) -> Result<Self, CardError> {
        let [id, envelope, expiration_date, owner_name]: [Value; 4] = row
            .try_into()
            .map_err(|row: Row| CardError::Row(format!("expected 4 columns, got {}", row.len())))?;

        match (id, envelope, expiration_date, owner_name) {
            (
                Value::Integer(id),
                Value::String(envelope),
                Value::String(expiration_date),
                Value::String(owner_name),
            ) => Ok(Self {
                id,
                envelope,
                expiration_date,
                owner_name,
            }),
            _ => Err(CardError::Row("unexpected column types".to_string())),
        }
    }
}

/// Repository contract for card persistence with a sealed card number.
#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Seal the card number and store the card, replacing any card with the same id.
    /// Returns the stored envelope.
    async fn save(&self, card: &CreditCard) -> anyhow::Result<String>;

    /// Every stored card. A card number that cannot be opened is reported per card.
    async fn list(&self) -> anyhow::Result<Vec<CardView>>;
}
