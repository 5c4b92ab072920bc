//! # textledger-sqlite
//!
//! SQLite-backed [`MessageStore`](textledger_core::MessageStore)
//! implementation, plus a small seeding API for building fixture
//! databases.
//!
//! The schema mirrors the shape of a device telephony database: a flat
//! `sms` table with millisecond dates, and `mms`/`mms_addr`/`mms_part`
//! tables with second dates, per-message participant rows, and body
//! parts that are either inline text or externally stored blobs.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod store;

pub use error::{Error, Result};
pub use store::{SeedAddress, SeedPart, SqliteMessageStore};
