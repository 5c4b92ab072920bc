//! SMS source: selection planning and fetch.
//!
//! The flat SMS table can evaluate every filter dimension natively, so
//! the planner pushes all of them down and nothing is left to filter in
//! memory.

use tracing::debug;

use crate::error::Result;
use crate::filter::MessageFilter;
use crate::store::MessageStore;
use crate::types::Message;

/// Pushable selection over the flat SMS table.
///
/// Clauses are conjoined; an absent or empty field places no
/// restriction. Rows come back newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmsSelection {
    /// Restrict to these ids; empty means unrestricted.
    pub ids: Vec<String>,
    /// Oldest date, inclusive, epoch milliseconds.
    pub min_date: Option<i64>,
    /// Newest date, inclusive, epoch milliseconds.
    pub max_date: Option<i64>,
    /// Exact sender address.
    pub sender: Option<String>,
    /// Substring the body must contain, matched with the store's native
    /// substring semantics.
    pub body: Option<String>,
    /// Upper bound on returned rows; `None` means all. Always safe here
    /// because the store evaluates every clause itself, so no row is
    /// dropped after the truncation.
    pub fetch_ceiling: Option<i64>,
}

/// Build the SMS selection for a normalized filter.
pub(crate) fn plan(filter: &MessageFilter) -> SmsSelection {
    SmsSelection {
        ids: filter.ids().to_vec(),
        min_date: filter.min_date(),
        max_date: filter.max_date(),
        sender: filter.sender().map(str::to_owned),
        body: filter.body().map(str::to_owned),
        fetch_ceiling: filter.fetch_ceiling(),
    }
}

/// Fetch the SMS side of a request. The store has already evaluated
/// every clause, so rows pass through unfiltered.
pub(crate) async fn fetch<S>(store: &S, filter: &MessageFilter) -> Result<Vec<Message>>
where
    S: MessageStore + ?Sized,
{
    let selection = plan(filter);
    let messages = store.query_sms(&selection).await?;
    debug!(count = messages.len(), "fetched sms rows");
    Ok(messages)
}
