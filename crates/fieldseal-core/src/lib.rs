//! Core abstractions for Fieldseal: the record store contract and the card record.
//! This crate is intentionally free of cryptography so stores stay swappable.

pub mod cards;
pub mod store;
