//! Merging and windowing of the two source result lists.

use crate::filter::MessageFilter;
use crate::types::Message;

/// Concatenate the SMS block with the MMS block and apply the global
/// `indexFrom`/`limit` window.
///
/// Each block is newest-first internally, but the merged list is not
/// re-sorted across sources: the SMS block always precedes the MMS
/// block, so the window indexes that concatenated order.
// TODO: merge the two blocks by date instead of concatenating once
// callers can absorb the ordering change.
pub(crate) fn merge_and_paginate(
    sms: Vec<Message>,
    mms: Vec<Message>,
    filter: &MessageFilter,
) -> Vec<Message> {
    let mut merged = sms;
    merged.extend(mms);
    paginate(merged, filter.index_from(), filter.limit())
}

/// Apply the `[start, end)` window over the merged list: `start` clamps
/// to the list length, a missing limit runs through the end, and a
/// non-positive limit yields an empty result.
fn paginate(messages: Vec<Message>, index_from: usize, limit: Option<i64>) -> Vec<Message> {
    let total = messages.len();
    let start = index_from.min(total);
    let end = match limit {
        None => total,
        Some(limit) if limit <= 0 => start,
        Some(limit) => start
            .saturating_add(usize::try_from(limit).unwrap_or(usize::MAX))
            .min(total),
    };
    messages.into_iter().skip(start).take(end - start).collect()
}
