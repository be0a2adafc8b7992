//! Merging one inbound update into canonical message state.
//!
//! A structured item overwrites the full recognized field set (full
//! resync); a field patch touches only the keys present in the map
//! (incremental update). Both merges are safe to repeat: applying the same
//! update twice leaves the message identical to applying it once, and a
//! patch never erases fields it does not mention.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::debug;

use courier_core::types::{DeliveryStatus, HandleId, Message, MessageGuid};

use crate::update::{RawUpdate, StructuredItem};

/// Merge `update` into `existing`, or construct a new message when there is
/// none.
///
/// The caller has already resolved and validated `guid` from the update;
/// unprocessable updates never reach this function. A field patch arriving
/// with no prior base record synthesizes a minimal message from only the
/// patched fields.
pub fn reconcile(guid: &MessageGuid, update: RawUpdate, existing: Option<Message>) -> Message {
    let mut message = existing.unwrap_or_else(|| Message::new(guid.clone()));
    match update {
        RawUpdate::Item(item) => apply_item(item, &mut message),
        RawUpdate::Fields(fields) => apply_fields(&fields, &mut message),
    }
    message
}

fn apply_item(item: StructuredItem, message: &mut Message) {
    message.guid = item.guid;
    message.sender = item.sender;
    message.timestamp = item.timestamp;
    message.text = item.text;
    message.subject = item.subject;
    message.service = item.service;
    message.is_from_me = item.is_from_me;
    message.status = item.status;
    message.time_delivered = item.time_delivered;
    message.time_read = item.time_read;
}

fn apply_fields(fields: &std::collections::HashMap<String, Value>, message: &mut Message) {
    for (key, value) in fields {
        match key.as_str() {
            "guid" => {
                if let Some(guid) = value.as_str() {
                    message.guid = MessageGuid::new(guid);
                }
            }
            "sender" => match value {
                Value::String(handle) => message.sender = Some(HandleId::new(handle.clone())),
                Value::Null => message.sender = None,
                _ => ignore(key, value),
            },
            "text" => match value.as_str() {
                Some(text) => message.text = text.to_string(),
                None => ignore(key, value),
            },
            "subject" => match value {
                Value::String(subject) => message.subject = Some(subject.clone()),
                Value::Null => message.subject = None,
                _ => ignore(key, value),
            },
            "service" => match value {
                Value::String(service) => message.service = Some(service.clone()),
                Value::Null => message.service = None,
                _ => ignore(key, value),
            },
            "isFromMe" => match value.as_bool() {
                Some(flag) => message.is_from_me = flag,
                None => ignore(key, value),
            },
            "status" => match value.as_str().and_then(DeliveryStatus::parse) {
                Some(status) => message.status = status,
                None => ignore(key, value),
            },
            "timestamp" => match parse_timestamp(value) {
                Some(timestamp) => message.timestamp = timestamp,
                None => ignore(key, value),
            },
            "timeDelivered" => match value {
                Value::Null => message.time_delivered = None,
                _ => match parse_timestamp(value) {
                    Some(timestamp) => message.time_delivered = Some(timestamp),
                    None => ignore(key, value),
                },
            },
            "timeRead" => match value {
                Value::Null => message.time_read = None,
                _ => match parse_timestamp(value) {
                    Some(timestamp) => message.time_read = Some(timestamp),
                    None => ignore(key, value),
                },
            },
            // Unrecognized keys pass through without error.
            _ => {}
        }
    }
}

fn ignore(key: &str, value: &Value) {
    debug!(key, %value, "ignoring field with unexpected shape");
}

/// Timestamps arrive either as epoch seconds or RFC 3339 strings.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn guid() -> MessageGuid {
        MessageGuid::new("m1")
    }

    fn item() -> StructuredItem {
        StructuredItem {
            guid: guid(),
            sender: Some(HandleId::new("+15551234567")),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap(),
            text: "original body".to_string(),
            subject: Some("greeting".to_string()),
            service: Some("iMessage".to_string()),
            is_from_me: false,
            status: DeliveryStatus::Sent,
            time_delivered: None,
            time_read: None,
        }
    }

    fn patch(pairs: &[(&str, Value)]) -> RawUpdate {
        let fields: HashMap<String, Value> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        RawUpdate::Fields(fields)
    }

    #[test]
    fn test_structured_item_twice_is_idempotent() {
        let first = reconcile(&guid(), RawUpdate::Item(item()), None);
        let second = reconcile(&guid(), RawUpdate::Item(item()), Some(first.clone()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_structured_item_overwrites_full_field_set() {
        let base = reconcile(&guid(), RawUpdate::Item(item()), None);

        let mut resync = item();
        resync.text = "edited body".to_string();
        resync.subject = None;
        resync.status = DeliveryStatus::Delivered;

        let merged = reconcile(&guid(), RawUpdate::Item(resync), Some(base));
        assert_eq!(merged.text, "edited body");
        assert_eq!(merged.subject, None);
        assert_eq!(merged.status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_partial_patch_changes_only_named_fields() {
        let base = reconcile(&guid(), RawUpdate::Item(item()), None);

        let merged = reconcile(
            &guid(),
            patch(&[("guid", json!("m1")), ("status", json!("delivered"))]),
            Some(base.clone()),
        );

        assert_eq!(merged.status, DeliveryStatus::Delivered);
        assert_eq!(merged.sender, base.sender);
        assert_eq!(merged.text, base.text);
        assert_eq!(merged.timestamp, base.timestamp);
        assert_eq!(merged.subject, base.subject);
    }

    #[test]
    fn test_partial_patch_twice_is_idempotent() {
        let base = reconcile(&guid(), RawUpdate::Item(item()), None);
        let update = patch(&[("guid", json!("m1")), ("text", json!("patched"))]);

        let first = reconcile(&guid(), update.clone(), Some(base));
        let second = reconcile(&guid(), update, Some(first.clone()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_fields_without_base_synthesizes_minimal_message() {
        let merged = reconcile(
            &guid(),
            patch(&[("guid", json!("m1")), ("text", json!("first sight"))]),
            None,
        );
        assert_eq!(merged.guid, guid());
        assert_eq!(merged.text, "first sight");
        assert!(merged.sender.is_none());
        assert_eq!(merged.status, DeliveryStatus::Sent);
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let base = reconcile(&guid(), RawUpdate::Item(item()), None);
        let merged = reconcile(
            &guid(),
            patch(&[("guid", json!("m1")), ("sparkle", json!("very"))]),
            Some(base.clone()),
        );
        assert_eq!(merged, base);
    }

    #[test]
    fn test_wrong_typed_values_are_ignored() {
        let base = reconcile(&guid(), RawUpdate::Item(item()), None);
        let merged = reconcile(
            &guid(),
            patch(&[
                ("guid", json!("m1")),
                ("text", json!(17)),
                ("isFromMe", json!("yes")),
                ("status", json!("teleported")),
            ]),
            Some(base.clone()),
        );
        assert_eq!(merged, base);
    }

    #[test]
    fn test_null_clears_optional_fields() {
        let base = reconcile(&guid(), RawUpdate::Item(item()), None);
        assert!(base.subject.is_some());

        let merged = reconcile(
            &guid(),
            patch(&[("guid", json!("m1")), ("subject", json!(null))]),
            Some(base),
        );
        assert_eq!(merged.subject, None);
    }

    #[test]
    fn test_timestamp_from_epoch_seconds() {
        let merged = reconcile(
            &guid(),
            patch(&[("guid", json!("m1")), ("timestamp", json!(1_700_000_000))]),
            None,
        );
        assert_eq!(merged.timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_timestamp_from_rfc3339() {
        let merged = reconcile(
            &guid(),
            patch(&[
                ("guid", json!("m1")),
                ("timeRead", json!("2024-05-01T12:00:00Z")),
            ]),
            None,
        );
        assert_eq!(merged.time_read.unwrap().timestamp(), 1_714_564_800);
    }

    #[test]
    fn test_status_patch_sets_delivery_fields_independently() {
        let base = reconcile(&guid(), RawUpdate::Item(item()), None);
        let merged = reconcile(
            &guid(),
            patch(&[
                ("guid", json!("m1")),
                ("status", json!("read")),
                ("timeRead", json!(1_700_000_100)),
            ]),
            Some(base),
        );
        assert_eq!(merged.status, DeliveryStatus::Read);
        assert_eq!(merged.time_read.unwrap().timestamp(), 1_700_000_100);
        assert!(merged.time_delivered.is_none());
    }
}
