//! Field-level encryption and concrete record stores.
//! Uses AES-128-CBC with keys sourced from configuration, the OS keyring, or test doubles.

pub mod field_cipher;
pub mod file_store;
pub mod key_provider;
