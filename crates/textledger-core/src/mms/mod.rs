//! MMS source: candidate planning, residual filtering, and the batched
//! join.
//!
//! The MMS store splits one message across a header row, address rows,
//! and part rows. Only id and date constraints can be evaluated on the
//! header table; sender and body constraints become a residual filter
//! applied in memory once each candidate is joined. Header dates are
//! stored in whole seconds, so the planner converts inbound millisecond
//! bounds down and the join converts outbound dates back up.

mod join;

use tracing::debug;

use crate::error::Result;
use crate::filter::MessageFilter;
use crate::store::MessageStore;
use crate::types::{Message, MmsAddress};

/// Pushable selection over the MMS header table. Date bounds are in the
/// store's unit, whole seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MmsSelection {
    /// Restrict to these ids; empty means unrestricted.
    pub ids: Vec<String>,
    /// Oldest date, inclusive, whole seconds.
    pub min_date_secs: Option<i64>,
    /// Newest date, inclusive, whole seconds.
    pub max_date_secs: Option<i64>,
    /// Upper bound on returned rows; `None` means all. Set only when no
    /// residual filtering follows: a post-join drop after truncation
    /// would shift the global window.
    pub fetch_ceiling: Option<i64>,
}

/// Constraints the header table cannot evaluate, applied in memory to
/// each joined record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResidualFilter {
    sender: Option<String>,
    body: Option<String>,
}

impl ResidualFilter {
    pub(crate) const fn is_empty(&self) -> bool {
        self.sender.is_none() && self.body.is_none()
    }

    /// A record passes when some real address equals the sender
    /// constraint exactly and the joined body contains the body
    /// substring, case-sensitively. Absent constraints always pass.
    pub(crate) fn matches(&self, addresses: &[MmsAddress], body: &str) -> bool {
        self.sender_matches(addresses) && self.body_matches(body)
    }

    fn sender_matches(&self, addresses: &[MmsAddress]) -> bool {
        self.sender
            .as_deref()
            .is_none_or(|wanted| addresses.iter().any(|address| address.sender == wanted))
    }

    fn body_matches(&self, body: &str) -> bool {
        self.body.as_deref().is_none_or(|needle| body.contains(needle))
    }
}

/// Convert an inclusive millisecond bound to the header table's unit.
/// Floor division, so negative bounds round toward older dates.
const fn to_store_seconds(millis: i64) -> i64 {
    millis.div_euclid(1000)
}

/// Build the header selection and the residual filter for a normalized
/// filter.
pub(crate) fn plan(filter: &MessageFilter) -> (MmsSelection, ResidualFilter) {
    let residual = ResidualFilter {
        sender: filter.sender().map(str::to_owned),
        body: filter.body().map(str::to_owned),
    };
    let selection = MmsSelection {
        ids: filter.ids().to_vec(),
        min_date_secs: filter.min_date().map(to_store_seconds),
        max_date_secs: filter.max_date().map(to_store_seconds),
        fetch_ceiling: if residual.is_empty() {
            filter.fetch_ceiling()
        } else {
            None
        },
    };
    (selection, residual)
}

/// Fetch the MMS side of a request: plan, query candidates, join.
pub(crate) async fn fetch<S>(store: &S, filter: &MessageFilter) -> Result<Vec<Message>>
where
    S: MessageStore + ?Sized,
{
    let (selection, residual) = plan(filter);
    let headers = store.query_mms_headers(&selection).await?;
    debug!(candidates = headers.len(), "selected mms candidates");
    join::resolve(store, headers, &residual).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filter::RawMessageFilter;

    fn address(sender: &str) -> MmsAddress {
        MmsAddress {
            message_id: "1".to_owned(),
            sender: sender.to_owned(),
            kind: 137,
        }
    }

    #[test]
    fn test_second_conversion_floors_toward_older_dates() {
        assert_eq!(to_store_seconds(0), 0);
        assert_eq!(to_store_seconds(999), 0);
        assert_eq!(to_store_seconds(1_000), 1);
        assert_eq!(to_store_seconds(1_999), 1);
        assert_eq!(to_store_seconds(-1), -1);
        assert_eq!(to_store_seconds(-1_000), -1);
        assert_eq!(to_store_seconds(-1_001), -2);
    }

    #[test]
    fn test_plan_converts_date_bounds_to_seconds() {
        let filter = MessageFilter::from_raw(RawMessageFilter {
            min_date: Some(1_500),
            max_date: Some(2_999),
            ..RawMessageFilter::default()
        });
        let (selection, residual) = plan(&filter);
        assert_eq!(selection.min_date_secs, Some(1));
        assert_eq!(selection.max_date_secs, Some(2));
        assert!(residual.is_empty());
    }

    #[test]
    fn test_plan_leaves_sender_and_body_as_residual() {
        let filter = MessageFilter::from_raw(RawMessageFilter {
            sender: Some("+15550001".to_owned()),
            body: Some("hi".to_owned()),
            limit: Some(4),
            ..RawMessageFilter::default()
        });
        let (selection, residual) = plan(&filter);
        assert!(selection.ids.is_empty());
        assert!(!residual.is_empty());
        assert_eq!(residual.sender.as_deref(), Some("+15550001"));
        assert_eq!(residual.body.as_deref(), Some("hi"));
    }

    #[test]
    fn test_plan_applies_ceiling_only_without_residual() {
        let unconstrained = MessageFilter::from_raw(RawMessageFilter {
            limit: Some(4),
            ..RawMessageFilter::default()
        });
        let (selection, _) = plan(&unconstrained);
        assert_eq!(selection.fetch_ceiling, Some(4));

        let constrained = MessageFilter::from_raw(RawMessageFilter {
            limit: Some(4),
            body: Some("hi".to_owned()),
            ..RawMessageFilter::default()
        });
        let (selection, _) = plan(&constrained);
        assert_eq!(selection.fetch_ceiling, None);
    }

    #[test]
    fn test_empty_residual_passes_everything() {
        let residual = ResidualFilter::default();
        assert!(residual.matches(&[], ""));
    }

    #[test]
    fn test_residual_sender_must_match_some_address_exactly() {
        let residual = ResidualFilter {
            sender: Some("+15550001".to_owned()),
            body: None,
        };
        assert!(residual.matches(&[address("+15550002"), address("+15550001")], ""));
        assert!(!residual.matches(&[address("+15550002")], ""));
        assert!(!residual.matches(&[], ""));
    }

    #[test]
    fn test_residual_body_match_is_case_sensitive_contains() {
        let residual = ResidualFilter {
            sender: None,
            body: Some("Lunch".to_owned()),
        };
        assert!(residual.matches(&[], "Lunch at noon?"));
        assert!(!residual.matches(&[], "lunch at noon?"));
    }

    #[test]
    fn test_residual_requires_both_constraints() {
        let residual = ResidualFilter {
            sender: Some("+15550001".to_owned()),
            body: Some("hi".to_owned()),
        };
        assert!(residual.matches(&[address("+15550001")], "hi there"));
        assert!(!residual.matches(&[address("+15550001")], "hello"));
        assert!(!residual.matches(&[address("+15550002")], "hi there"));
    }
}
