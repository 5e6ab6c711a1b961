//! Messaging transport
//!
//! Telegram Bot API over HTTPS: long polling for inbound messages and
//! `sendMessage` with reply keyboards for prompts.

mod error;
mod telegram;
pub mod types;

pub use error::{TransportError, TransportErrorKind};
pub use telegram::{TelegramClient, DEFAULT_API_URL};
pub use types::Update;
