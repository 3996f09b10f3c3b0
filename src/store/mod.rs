//! Persistence layer: the leads sheet and its in-memory stand-in.

pub mod auth;
pub mod memory;
pub mod sheets;
pub mod traits;

pub use auth::{ServiceAccountAuth, ServiceAccountKey, SheetsScope};
pub use memory::MemoryStore;
pub use sheets::{SheetsConfig, SheetsStore};
pub use traits::LeadStore;
