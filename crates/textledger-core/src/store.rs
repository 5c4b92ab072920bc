//! The abstract store boundary the engine reads from.
//!
//! A backend implements [`MessageStore`]; the `textledger-sqlite` crate
//! ships the SQLite-backed implementation. The engine never issues
//! per-message queries, so the trait has no "addresses of one message"
//! shape: addresses and parts are always requested for a whole id
//! batch.

use async_trait::async_trait;
use thiserror::Error;

use crate::mms::MmsSelection;
use crate::sms::SmsSelection;
use crate::types::{Message, MmsAddress, MmsHeader, MmsPart};

/// A store query failed.
///
/// The whole read fails with it; the engine never substitutes an empty
/// result for a failed query.
#[derive(Debug, Error)]
#[error("message store unavailable: {reason}")]
pub struct StoreUnavailableError {
    reason: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreUnavailableError {
    /// Failure with a bare description.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source: None,
        }
    }

    /// Failure wrapping the backend error that caused it.
    #[must_use]
    pub fn with_source(
        reason: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            reason: reason.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Description of the failed operation.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Read access to a device's SMS and MMS tables.
///
/// Contract for implementations:
///
/// - [`query_sms`](Self::query_sms) evaluates every clause of the
///   selection itself and returns complete [`Message`] values, dates in
///   milliseconds, newest first.
/// - [`query_mms_headers`](Self::query_mms_headers) evaluates id and
///   date clauses, dates in whole seconds, newest first. Sender and
///   body constraints never reach the header table; the engine resolves
///   them after the join.
/// - [`query_mms_addresses`](Self::query_mms_addresses) and
///   [`query_mms_parts`](Self::query_mms_parts) return every row for
///   the given id batch in stable store order; the engine groups them
///   by message. An id with no rows is simply absent from the result,
///   never an error.
/// - [`read_part_text`](Self::read_part_text) returns the
///   externally-stored text of one part; a part without stored content
///   yields the empty string.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Query the flat SMS table.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot complete the query.
    async fn query_sms(&self, selection: &SmsSelection)
    -> Result<Vec<Message>, StoreUnavailableError>;

    /// Query MMS header rows, yielding the join candidates.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot complete the query.
    async fn query_mms_headers(
        &self,
        selection: &MmsSelection,
    ) -> Result<Vec<MmsHeader>, StoreUnavailableError>;

    /// Fetch all address rows for a batch of MMS ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot complete the query.
    async fn query_mms_addresses(
        &self,
        ids: &[String],
    ) -> Result<Vec<MmsAddress>, StoreUnavailableError>;

    /// Fetch all part rows for a batch of MMS ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot complete the query.
    async fn query_mms_parts(&self, ids: &[String])
    -> Result<Vec<MmsPart>, StoreUnavailableError>;

    /// Read the externally-stored text content of a single part.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot complete the read.
    async fn read_part_text(&self, part_id: &str) -> Result<String, StoreUnavailableError>;
}
