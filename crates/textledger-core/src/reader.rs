//! The message reader: the one entry point that turns a raw filter
//! into a merged, windowed message list.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::filter::{MessageFilter, RawMessageFilter};
use crate::store::MessageStore;
use crate::types::Message;
use crate::{merge, mms, sms};

/// Unified reader over one [`MessageStore`].
///
/// Each call normalizes its filter once, then runs the SMS fetch and
/// the MMS pipeline as two request-scoped tasks sharing the store
/// handle read-only. The call returns only when both tasks have
/// finished; either failure fails the whole call, and there are no
/// partial results.
pub struct MessageReader<S> {
    store: Arc<S>,
}

impl<S> MessageReader<S>
where
    S: MessageStore + 'static,
{
    /// Create a reader owning its store.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Create a reader over an already-shared store handle.
    #[must_use]
    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Fetch all messages matching the raw filter.
    ///
    /// The result holds the SMS block followed by the MMS block, each
    /// newest first, windowed by `indexFrom`/`limit`. A default
    /// (all-absent) filter returns everything.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] when either source query fails
    /// and [`crate::Error::Task`] when a fetch task panics or is
    /// aborted.
    pub async fn get_messages(&self, raw: RawMessageFilter) -> Result<Vec<Message>> {
        let filter = Arc::new(MessageFilter::from_raw(raw));
        debug!(?filter, "normalized message filter");

        let sms_task = tokio::spawn({
            let store = Arc::clone(&self.store);
            let filter = Arc::clone(&filter);
            async move { sms::fetch(store.as_ref(), &filter).await }
        });
        let mms_task = tokio::spawn({
            let store = Arc::clone(&self.store);
            let filter = Arc::clone(&filter);
            async move { mms::fetch(store.as_ref(), &filter).await }
        });

        let (sms_joined, mms_joined) = tokio::join!(sms_task, mms_task);
        let sms_messages = sms_joined??;
        let mms_messages = mms_joined??;

        debug!(
            sms = sms_messages.len(),
            mms = mms_messages.len(),
            "merging source blocks"
        );
        Ok(merge::merge_and_paginate(sms_messages, mms_messages, &filter))
    }

    /// Same as [`Self::get_messages`], starting from an undecoded JSON
    /// request; `null` is the unrestricted filter.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidFilter`] when the value cannot be
    /// decoded, plus everything [`Self::get_messages`] returns.
    pub async fn get_messages_json(&self, raw: serde_json::Value) -> Result<Vec<Message>> {
        let raw = RawMessageFilter::from_json(raw)?;
        self.get_messages(raw).await
    }
}
