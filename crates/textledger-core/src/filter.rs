//! Filter request shapes and normalization.
//!
//! A request arrives loosely typed as a [`RawMessageFilter`], built
//! directly or decoded from JSON. Normalization happens exactly once,
//! up front, and produces an immutable [`MessageFilter`]; every later
//! stage reads the same normalized values and never re-checks the raw
//! request.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw filter request could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid message filter: {reason}")]
pub struct InvalidFilterError {
    reason: String,
}

impl InvalidFilterError {
    /// Create an error describing the malformed field.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Description of what was malformed.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Loosely-typed filter request, field names matching the JSON wire
/// form.
///
/// Every field is optional; [`RawMessageFilter::default`] is the
/// unrestricted request that returns everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMessageFilter {
    /// Restrict to these message ids.
    pub ids: Option<Vec<String>>,
    /// Substring the body must contain.
    pub body: Option<String>,
    /// Exact sender address to match.
    pub sender: Option<String>,
    /// Oldest date to include, inclusive, epoch milliseconds.
    pub min_date: Option<i64>,
    /// Newest date to include, inclusive, epoch milliseconds.
    pub max_date: Option<i64>,
    /// Number of merged results to skip.
    pub index_from: Option<i64>,
    /// Maximum number of merged results to return.
    pub limit: Option<i64>,
}

impl RawMessageFilter {
    /// Decode a filter from an arbitrary JSON value.
    ///
    /// `null` is the unrestricted request. Unknown fields are ignored;
    /// a known field holding the wrong type is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidFilterError`] when the value is not an object
    /// or a field cannot be decoded.
    pub fn from_json(value: serde_json::Value) -> Result<Self, InvalidFilterError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|err| InvalidFilterError::new(err.to_string()))
    }
}

/// Normalized, immutable filter constraints.
///
/// Built once by [`MessageFilter::from_raw`]. The fields are private so
/// no stage can edit constraints mid-request; accessors expose the
/// normalized values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageFilter {
    ids: Vec<String>,
    body: Option<String>,
    sender: Option<String>,
    min_date: Option<i64>,
    max_date: Option<i64>,
    index_from: usize,
    limit: Option<i64>,
}

impl MessageFilter {
    /// Normalize a raw request.
    ///
    /// Missing `ids` becomes the empty set, meaning no id restriction,
    /// and duplicate ids collapse to their first occurrence. Empty
    /// `sender` and `body` strings become absent. A missing or negative
    /// `indexFrom` clamps to zero. A missing `limit` stays unbounded;
    /// a non-positive one is kept and later yields an empty window.
    #[must_use]
    pub fn from_raw(raw: RawMessageFilter) -> Self {
        let mut seen = HashSet::new();
        let ids = raw
            .ids
            .unwrap_or_default()
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        Self {
            ids,
            body: raw.body.filter(|body| !body.is_empty()),
            sender: raw.sender.filter(|sender| !sender.is_empty()),
            min_date: raw.min_date,
            max_date: raw.max_date,
            index_from: raw
                .index_from
                .and_then(|index| usize::try_from(index).ok())
                .unwrap_or(0),
            limit: raw.limit,
        }
    }

    /// Ids to restrict to, duplicates removed, first occurrence order.
    /// Empty means unrestricted.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Substring the body must contain, if constrained.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Exact sender address to match, if constrained.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Oldest date to include, inclusive, epoch milliseconds.
    #[must_use]
    pub const fn min_date(&self) -> Option<i64> {
        self.min_date
    }

    /// Newest date to include, inclusive, epoch milliseconds.
    #[must_use]
    pub const fn max_date(&self) -> Option<i64> {
        self.max_date
    }

    /// Number of merged results to skip, never negative.
    #[must_use]
    pub const fn index_from(&self) -> usize {
        self.index_from
    }

    /// Maximum number of merged results to return; `None` when
    /// unbounded, non-positive when the caller asked for nothing.
    #[must_use]
    pub const fn limit(&self) -> Option<i64> {
        self.limit
    }

    /// Most rows any single source needs to produce for a correct
    /// window, `None` when the request is unbounded.
    ///
    /// A source may truncate its result to this many rows only if it
    /// evaluated every constraint itself. If rows are still dropped
    /// after the truncation, the global window would shift; the
    /// planners decide per source whether that holds.
    #[must_use]
    pub fn fetch_ceiling(&self) -> Option<i64> {
        self.limit.map(|limit| {
            if limit <= 0 {
                0
            } else {
                let skipped = i64::try_from(self.index_from).unwrap_or(i64::MAX);
                skipped.saturating_add(limit)
            }
        })
    }
}
