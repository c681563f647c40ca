//! Chat over the relay: filtering, backup, and the screen's view-model.

pub mod backup;
pub mod filter;
pub mod service;
pub mod view_model;

pub use backup::{BackupLocator, BackupUploader, DisabledBackup, PinningUploader};
pub use filter::{RecordFilter, SignaturePolicy, Verdict};
pub use service::ChatService;
pub use view_model::{ChatViewModel, Draft, SendFailure, SendState};
