//! Message models shared between the engine and store backends.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Body text substituted when an MMS has no qualifying text parts.
pub const NO_TEXT_BODY: &str = "[No text content]";

/// Sentinel address marking an unfilled participant slot in the MMS
/// address table. Matched case-insensitively; such rows never reach
/// callers or filters.
pub const PLACEHOLDER_ADDRESS: &str = "insert-address-token";

/// Content types whose parts contribute to an MMS body.
const TEXT_CONTENT_TYPES: [&str; 2] = ["text/plain", "application/smil"];

/// Which store a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Flat short-text message row.
    Sms,
    /// Multimedia message assembled from header, address, and part rows.
    Mms,
}

impl MessageType {
    /// Wire string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Mms => "mms",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unified message, regardless of source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-assigned identifier, unique within its source.
    pub id: String,
    /// Originating address; empty when the store has no usable sender.
    pub sender: String,
    /// Text content. MMS messages without any text part carry
    /// [`NO_TEXT_BODY`].
    pub body: String,
    /// Timestamp in milliseconds since the UTC epoch, regardless of the
    /// unit the source stores.
    pub date: i64,
    /// Source the message came from.
    pub message_type: MessageType,
}

/// Header row of an MMS message: the candidate shape for joining.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmsHeader {
    /// Message id.
    pub id: String,
    /// Timestamp in whole seconds since the UTC epoch, the unit the MMS
    /// store keeps dates in.
    pub date_secs: i64,
}

/// One participant row of an MMS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmsAddress {
    /// Id of the MMS this address belongs to.
    pub message_id: String,
    /// Participant address.
    pub sender: String,
    /// Slot type code as stored (originator, recipient, ...).
    pub kind: i64,
}

impl MmsAddress {
    /// Whether this row is the unfilled-slot sentinel rather than a
    /// real participant.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.sender.eq_ignore_ascii_case(PLACEHOLDER_ADDRESS)
    }
}

/// One body-part row of an MMS message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmsPart {
    /// Id of the MMS this part belongs to.
    pub message_id: String,
    /// Store-assigned part id, used for per-part content reads.
    pub part_id: String,
    /// MIME content type of the part.
    pub content_type: String,
    /// External content reference. When present, the part's text must
    /// be fetched with
    /// [`MessageStore::read_part_text`](crate::store::MessageStore::read_part_text).
    pub data: Option<String>,
    /// Inline text, used when no external reference is present.
    pub text: Option<String>,
}

impl MmsPart {
    /// Whether this part's content type contributes to the message body.
    #[must_use]
    pub fn is_text(&self) -> bool {
        TEXT_CONTENT_TYPES.contains(&self.content_type.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn part(content_type: &str) -> MmsPart {
        MmsPart {
            message_id: "1".to_owned(),
            part_id: "10".to_owned(),
            content_type: content_type.to_owned(),
            data: None,
            text: None,
        }
    }

    #[test]
    fn test_placeholder_address_is_case_insensitive() {
        let address = MmsAddress {
            message_id: "1".to_owned(),
            sender: "Insert-Address-Token".to_owned(),
            kind: 137,
        };
        assert!(address.is_placeholder());
    }

    #[test]
    fn test_real_address_is_not_placeholder() {
        let address = MmsAddress {
            message_id: "1".to_owned(),
            sender: "+15550001".to_owned(),
            kind: 137,
        };
        assert!(!address.is_placeholder());
    }

    #[test]
    fn test_text_parts_recognized_exactly() {
        assert!(part("text/plain").is_text());
        assert!(part("application/smil").is_text());
        assert!(!part("image/jpeg").is_text());
        assert!(!part("text/plain; charset=utf-8").is_text());
        assert!(!part("TEXT/PLAIN").is_text());
    }

    #[test]
    fn test_message_serializes_with_wire_field_names() {
        let message = Message {
            id: "7".to_owned(),
            sender: "+15550001".to_owned(),
            body: "hello".to_owned(),
            date: 1_700_000_000_000,
            message_type: MessageType::Mms,
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "7",
                "sender": "+15550001",
                "body": "hello",
                "date": 1_700_000_000_000_i64,
                "messageType": "mms",
            })
        );
    }

    #[test]
    fn test_message_type_displays_as_wire_string() {
        assert_eq!(MessageType::Sms.to_string(), "sms");
        assert_eq!(MessageType::Mms.to_string(), "mms");
    }
}
