pub mod commands;
pub mod events;
pub mod types;

pub use commands::{ChatCommand, WalletCommand};
pub use events::AppEvent;
pub use types::{ChatRecord, RecordKey};
