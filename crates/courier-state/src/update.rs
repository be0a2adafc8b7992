//! The two inbound update shapes the upstream service produces.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use courier_core::types::{DeliveryStatus, HandleId, MessageGuid};

/// A complete, fixed-schema message record. Reconciling one models a full
/// resync: every recognized field is overwritten.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredItem {
    pub guid: MessageGuid,
    pub sender: Option<HandleId>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub text: String,
    pub subject: Option<String>,
    pub service: Option<String>,
    #[serde(default)]
    pub is_from_me: bool,
    #[serde(default)]
    pub status: DeliveryStatus,
    pub time_delivered: Option<DateTime<Utc>>,
    pub time_read: Option<DateTime<Utc>>,
}

/// One inbound message change.
///
/// The upstream service emits either a full record or an untyped key/value
/// map carrying a partial patch; both address a message by GUID. An update
/// from which no GUID can be derived is unprocessable.
#[derive(Clone, Debug)]
pub enum RawUpdate {
    /// Fixed-schema full record.
    Item(StructuredItem),
    /// Arbitrary subset of fields. Recognizes at minimum the `"guid"` key;
    /// unrecognized keys are ignored without error.
    Fields(HashMap<String, Value>),
}

impl RawUpdate {
    /// The message this update addresses, if derivable.
    pub fn guid(&self) -> Option<MessageGuid> {
        match self {
            RawUpdate::Item(item) => Some(item.guid.clone()),
            RawUpdate::Fields(fields) => fields
                .get("guid")
                .and_then(Value::as_str)
                .map(MessageGuid::new),
        }
    }
}

impl fmt::Display for RawUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawUpdate::Item(item) => write!(f, "structured item {}", item.guid),
            RawUpdate::Fields(fields) => match self.guid() {
                Some(guid) => write!(f, "field patch {} ({} fields)", guid, fields.len()),
                None => write!(f, "field patch without guid ({} fields)", fields.len()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> RawUpdate {
        RawUpdate::Fields(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn sample_item(guid: &str) -> StructuredItem {
        StructuredItem {
            guid: MessageGuid::new(guid),
            sender: Some(HandleId::new("+15551234567")),
            timestamp: Utc::now(),
            text: "hello".to_string(),
            subject: None,
            service: None,
            is_from_me: false,
            status: DeliveryStatus::Sent,
            time_delivered: None,
            time_read: None,
        }
    }

    #[test]
    fn test_item_guid() {
        let update = RawUpdate::Item(sample_item("m1"));
        assert_eq!(update.guid(), Some(MessageGuid::new("m1")));
    }

    #[test]
    fn test_fields_guid() {
        let update = fields(&[("guid", json!("m2")), ("text", json!("hi"))]);
        assert_eq!(update.guid(), Some(MessageGuid::new("m2")));
    }

    #[test]
    fn test_fields_without_guid() {
        let update = fields(&[("text", json!("hi"))]);
        assert_eq!(update.guid(), None);
    }

    #[test]
    fn test_fields_guid_wrong_type() {
        let update = fields(&[("guid", json!(42))]);
        assert_eq!(update.guid(), None);
    }

    #[test]
    fn test_display() {
        let update = RawUpdate::Item(sample_item("m1"));
        assert_eq!(update.to_string(), "structured item m1");

        let update = fields(&[("guid", json!("m2")), ("text", json!("hi"))]);
        assert_eq!(update.to_string(), "field patch m2 (2 fields)");

        let update = fields(&[("text", json!("hi"))]);
        assert_eq!(update.to_string(), "field patch without guid (1 fields)");
    }

    #[test]
    fn test_structured_item_deserializes_camel_case() {
        let json = r#"{
            "guid": "m1",
            "sender": "+15551234567",
            "timestamp": "2024-05-01T12:00:00Z",
            "text": "hello",
            "subject": null,
            "service": "iMessage",
            "isFromMe": true,
            "status": "delivered",
            "timeDelivered": "2024-05-01T12:00:05Z",
            "timeRead": null
        }"#;
        let item: StructuredItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.guid.0, "m1");
        assert!(item.is_from_me);
        assert_eq!(item.status, DeliveryStatus::Delivered);
        assert!(item.time_delivered.is_some());
    }
}
