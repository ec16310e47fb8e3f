pub mod credential;
pub mod gemini;
#[cfg(test)]
pub mod scripted;
pub mod stats_db;
pub mod store;

pub use credential::CredentialSlot;
pub use gemini::GeminiAdapter;
pub use stats_db::PgStatsAdapter;
pub use store::{FileStore, MemoryStore};
