// ./src/registry/mod.rs
//! The Registry Store (C1, spec §4.1): the authoritative, shared-readable
//! store of Function Records, consumed by C2/C4/C5/C6.
pub mod cdc;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod store;

pub use cdc::{ChangeEvent, ChangeOp};
#[cfg(feature = "postgres")]
pub use postgres::PostgresRegistryStore;
pub use store::{InMemoryRegistryStore, RegistryStore, SqliteRegistryStore};
