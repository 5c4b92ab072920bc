//! Batched resolution of candidate MMS messages.
//!
//! Addresses and parts for the whole candidate set are fetched in one
//! query each and regrouped by message id in memory, so the number of
//! store round trips stays flat no matter how many candidates there
//! are. Only external part content still needs a per-part read, because
//! the store addresses part bodies individually. A candidate with no
//! address or part rows is not an error: it joins with an empty
//! participant list and falls back to the placeholder body text.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::mms::ResidualFilter;
use crate::store::MessageStore;
use crate::types::{Message, MessageType, MmsAddress, MmsHeader, MmsPart, NO_TEXT_BODY};

/// One candidate joined with its addresses and accumulated body text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct JoinedMms {
    id: String,
    date_secs: i64,
    addresses: Vec<MmsAddress>,
    body: String,
}

impl JoinedMms {
    /// Collapse to the unified shape: sender is the first surviving
    /// address, an empty body becomes the no-content marker, and the
    /// date converts back up to milliseconds.
    fn into_message(self) -> Message {
        let sender = self
            .addresses
            .first()
            .map(|address| address.sender.clone())
            .unwrap_or_default();
        let body = if self.body.is_empty() {
            NO_TEXT_BODY.to_owned()
        } else {
            self.body
        };
        Message {
            id: self.id,
            sender,
            body,
            date: self.date_secs * 1000,
            message_type: MessageType::Mms,
        }
    }
}

/// Join the candidate headers against their address and part batches,
/// apply the residual filter, and produce messages in header order.
///
/// An empty candidate set issues no queries at all.
pub(crate) async fn resolve<S>(
    store: &S,
    headers: Vec<MmsHeader>,
    residual: &ResidualFilter,
) -> Result<Vec<Message>>
where
    S: MessageStore + ?Sized,
{
    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<String> = headers.iter().map(|header| header.id.clone()).collect();
    let mut addresses = group_addresses(store.query_mms_addresses(&ids).await?);
    let mut bodies = accumulate_text(store, store.query_mms_parts(&ids).await?).await?;

    let mut messages = Vec::with_capacity(headers.len());
    let mut dropped = 0_usize;
    for header in headers {
        let joined = JoinedMms {
            addresses: addresses.remove(&header.id).unwrap_or_default(),
            body: bodies.remove(&header.id).unwrap_or_default(),
            id: header.id,
            date_secs: header.date_secs,
        };
        if residual.matches(&joined.addresses, &joined.body) {
            messages.push(joined.into_message());
        } else {
            dropped += 1;
        }
    }
    debug!(joined = messages.len(), dropped, "joined mms candidates");
    Ok(messages)
}

/// Group address rows by message id, keeping store order per message
/// and dropping unfilled-slot placeholder rows before any filter sees
/// them.
fn group_addresses(rows: Vec<MmsAddress>) -> HashMap<String, Vec<MmsAddress>> {
    let mut grouped: HashMap<String, Vec<MmsAddress>> = HashMap::new();
    for row in rows {
        if row.is_placeholder() {
            continue;
        }
        grouped.entry(row.message_id.clone()).or_default().push(row);
    }
    grouped
}

/// Accumulate body text per message id from the part batch, keeping
/// store order. Non-text parts are skipped. A text part's content comes
/// from the per-part read when it is stored externally, otherwise from
/// its inline text; missing content contributes nothing. Fragments are
/// appended without separators.
async fn accumulate_text<S>(store: &S, rows: Vec<MmsPart>) -> Result<HashMap<String, String>>
where
    S: MessageStore + ?Sized,
{
    let mut bodies: HashMap<String, String> = HashMap::new();
    for part in rows {
        if !part.is_text() {
            continue;
        }
        let fragment = if part.data.is_some() {
            store.read_part_text(&part.part_id).await?
        } else {
            part.text.unwrap_or_default()
        };
        bodies.entry(part.message_id).or_default().push_str(&fragment);
    }
    Ok(bodies)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::mms::MmsSelection;
    use crate::sms::SmsSelection;
    use crate::store::StoreUnavailableError;

    /// Store stub that only serves per-part content reads.
    struct PartContentStore {
        contents: HashMap<String, String>,
    }

    #[async_trait]
    impl MessageStore for PartContentStore {
        async fn query_sms(
            &self,
            _selection: &SmsSelection,
        ) -> std::result::Result<Vec<Message>, StoreUnavailableError> {
            Ok(Vec::new())
        }

        async fn query_mms_headers(
            &self,
            _selection: &MmsSelection,
        ) -> std::result::Result<Vec<MmsHeader>, StoreUnavailableError> {
            Ok(Vec::new())
        }

        async fn query_mms_addresses(
            &self,
            _ids: &[String],
        ) -> std::result::Result<Vec<MmsAddress>, StoreUnavailableError> {
            Ok(Vec::new())
        }

        async fn query_mms_parts(
            &self,
            _ids: &[String],
        ) -> std::result::Result<Vec<MmsPart>, StoreUnavailableError> {
            Ok(Vec::new())
        }

        async fn read_part_text(
            &self,
            part_id: &str,
        ) -> std::result::Result<String, StoreUnavailableError> {
            Ok(self.contents.get(part_id).cloned().unwrap_or_default())
        }
    }

    fn address(message_id: &str, sender: &str) -> MmsAddress {
        MmsAddress {
            message_id: message_id.to_owned(),
            sender: sender.to_owned(),
            kind: 137,
        }
    }

    fn inline_part(message_id: &str, part_id: &str, content_type: &str, text: &str) -> MmsPart {
        MmsPart {
            message_id: message_id.to_owned(),
            part_id: part_id.to_owned(),
            content_type: content_type.to_owned(),
            data: None,
            text: Some(text.to_owned()),
        }
    }

    fn external_part(message_id: &str, part_id: &str) -> MmsPart {
        MmsPart {
            message_id: message_id.to_owned(),
            part_id: part_id.to_owned(),
            content_type: "text/plain".to_owned(),
            data: Some(part_id.to_owned()),
            text: None,
        }
    }

    #[test]
    fn test_placeholder_rows_dropped_before_grouping() {
        let grouped = group_addresses(vec![
            address("1", "insert-address-token"),
            address("1", "+15550001"),
            address("2", "INSERT-ADDRESS-TOKEN"),
        ]);
        assert_eq!(grouped["1"], [address("1", "+15550001")]);
        assert!(!grouped.contains_key("2"));
    }

    #[test]
    fn test_grouped_rows_keep_store_order_per_message() {
        let grouped = group_addresses(vec![
            address("1", "+15550001"),
            address("2", "+15550009"),
            address("1", "+15550002"),
        ]);
        assert_eq!(
            grouped["1"],
            [address("1", "+15550001"), address("1", "+15550002")]
        );
    }

    #[tokio::test]
    async fn test_fragments_append_in_store_order_without_separator() {
        let store = PartContentStore {
            contents: HashMap::new(),
        };
        let bodies = accumulate_text(
            &store,
            vec![
                inline_part("1", "10", "text/plain", "Hello "),
                inline_part("1", "11", "text/plain", "world"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(bodies["1"], "Hello world");
    }

    #[tokio::test]
    async fn test_non_text_parts_are_skipped() {
        let store = PartContentStore {
            contents: HashMap::new(),
        };
        let bodies = accumulate_text(
            &store,
            vec![
                inline_part("1", "10", "image/jpeg", "binary"),
                inline_part("1", "11", "application/smil", "<smil/>"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(bodies["1"], "<smil/>");
    }

    #[tokio::test]
    async fn test_external_parts_read_through_the_store() {
        let store = PartContentStore {
            contents: HashMap::from([("10".to_owned(), "from disk".to_owned())]),
        };
        let bodies = accumulate_text(
            &store,
            vec![
                external_part("1", "10"),
                inline_part("1", "11", "text/plain", "!"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(bodies["1"], "from disk!");
    }

    #[tokio::test]
    async fn test_missing_content_contributes_nothing() {
        let store = PartContentStore {
            contents: HashMap::new(),
        };
        let part = MmsPart {
            message_id: "1".to_owned(),
            part_id: "10".to_owned(),
            content_type: "text/plain".to_owned(),
            data: None,
            text: None,
        };
        let bodies = accumulate_text(&store, vec![part]).await.unwrap();
        assert_eq!(bodies["1"], "");
    }

    #[test]
    fn test_sender_is_first_surviving_address() {
        let joined = JoinedMms {
            id: "1".to_owned(),
            date_secs: 2,
            addresses: vec![address("1", "+15550001"), address("1", "+15550002")],
            body: "hi".to_owned(),
        };
        let message = joined.into_message();
        assert_eq!(message.sender, "+15550001");
    }

    #[test]
    fn test_empty_address_list_yields_empty_sender() {
        let joined = JoinedMms {
            id: "1".to_owned(),
            date_secs: 2,
            addresses: Vec::new(),
            body: "hi".to_owned(),
        };
        assert_eq!(joined.into_message().sender, "");
    }

    #[test]
    fn test_empty_body_falls_back_to_no_content_marker() {
        let joined = JoinedMms {
            id: "1".to_owned(),
            date_secs: 2,
            addresses: Vec::new(),
            body: String::new(),
        };
        assert_eq!(joined.into_message().body, NO_TEXT_BODY);
    }

    #[test]
    fn test_date_converts_back_to_milliseconds() {
        let joined = JoinedMms {
            id: "1".to_owned(),
            date_secs: 1_700_000_000,
            addresses: Vec::new(),
            body: "hi".to_owned(),
        };
        let message = joined.into_message();
        assert_eq!(message.date, 1_700_000_000_000);
        assert_eq!(message.message_type, MessageType::Mms);
    }
}
