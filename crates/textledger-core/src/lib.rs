//! # textledger-core
//!
//! Aggregation engine over a device's SMS and MMS stores.
//!
//! One call takes a loose filter request and produces a unified,
//! windowed message list. The pipeline is:
//!
//! - Filter normalization: the raw request becomes an immutable
//!   [`MessageFilter`] once, up front.
//! - Per-source planning: the SMS table evaluates every constraint
//!   natively; the MMS header table evaluates only ids and dates, with
//!   sender/body left as a residual filter.
//! - Batched joining: addresses and body parts for the whole MMS
//!   candidate set are fetched in two queries and regrouped in memory,
//!   never one query per message.
//! - Merge and windowing: the SMS block followed by the MMS block,
//!   sliced by `indexFrom`/`limit`.
//!
//! The engine is generic over the [`MessageStore`] trait; the
//! `textledger-sqlite` crate ships the SQLite-backed implementation.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod filter;
mod merge;
pub mod mms;
mod reader;
pub mod sms;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use filter::{InvalidFilterError, MessageFilter, RawMessageFilter};
pub use mms::MmsSelection;
pub use reader::MessageReader;
pub use sms::SmsSelection;
pub use store::{MessageStore, StoreUnavailableError};
pub use types::{
    Message, MessageType, MmsAddress, MmsHeader, MmsPart, NO_TEXT_BODY, PLACEHOLDER_ADDRESS,
};
