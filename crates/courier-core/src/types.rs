use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Newtype Wrappers - Identity
// =============================================================================

/// Opaque stable key for a conversation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Globally unique, stable identifier for a single message.
///
/// Unique within a conversation's message map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageGuid(pub String);

impl MessageGuid {
    pub fn new(guid: impl Into<String>) -> Self {
        Self(guid.into())
    }
}

impl fmt::Display for MessageGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A participant address (phone number, email, or service handle).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(pub String);

impl HandleId {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Delivery lifecycle of a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// Parse the untyped-field representation. Returns `None` for anything
    /// outside the closed set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(DeliveryStatus::Sent),
            "delivered" => Some(DeliveryStatus::Delivered),
            "read" => Some(DeliveryStatus::Read),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

/// Membership state of the local account in a conversation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinState {
    #[default]
    Joined,
    Left,
    Removed,
}

/// Authentication axis of service health.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationState {
    #[default]
    Unknown,
    Authenticated,
    Unauthenticated,
}

/// Connection axis of service health.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Connecting,
    Connected,
    Disconnected,
}

/// Complete service health: both axes, always carried together so a
/// subscriber never needs prior history to know current health.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthState {
    pub authentication_state: AuthenticationState,
    pub connection_state: ConnectionState,
}

// =============================================================================
// Entities
// =============================================================================

/// Canonical mutable state of one message.
///
/// Created on the first successful reconciliation for its GUID, mutated in
/// place on subsequent reconciliations, and removed only by an explicit
/// removal operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub guid: MessageGuid,
    pub sender: Option<HandleId>,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub subject: Option<String>,
    pub service: Option<String>,
    pub is_from_me: bool,
    pub status: DeliveryStatus,
    pub time_delivered: Option<DateTime<Utc>>,
    pub time_read: Option<DateTime<Utc>>,
}

impl Message {
    /// A minimal message carrying only its GUID. Everything else starts at
    /// the field defaults; the arrival time stands in for the timestamp
    /// until an update supplies one.
    pub fn new(guid: MessageGuid) -> Self {
        Self {
            guid,
            sender: None,
            timestamp: Utc::now(),
            text: String::new(),
            subject: None,
            service: None,
            is_from_me: false,
            status: DeliveryStatus::Sent,
            time_delivered: None,
            time_read: None,
        }
    }
}

/// Per-conversation properties pushed by the conversation directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationProperties {
    pub read_receipts: bool,
    pub ignore_alerts: bool,
}

/// One conversation: exclusive owner of its message map plus directory
/// metadata. Live instances never leave the registry; observers only see
/// [`ConversationSnapshot`] values.
#[derive(Clone, Debug)]
pub struct Conversation {
    pub id: ConversationId,
    pub messages: HashMap<MessageGuid, Message>,
    pub display_name: Option<String>,
    pub participants: Vec<HandleId>,
    pub unread_count: u64,
    pub join_state: JoinState,
    pub properties: ConversationProperties,
}

impl Conversation {
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            messages: HashMap::new(),
            display_name: None,
            participants: Vec::new(),
            unread_count: 0,
            join_state: JoinState::default(),
            properties: ConversationProperties::default(),
        }
    }

    /// Immutable value-semantics view carried by events.
    pub fn snapshot(&self) -> ConversationSnapshot {
        ConversationSnapshot {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            participants: self.participants.clone(),
            unread_count: self.unread_count,
            join_state: self.join_state,
            properties: self.properties,
            message_count: self.messages.len() as u64,
        }
    }
}

/// Point-in-time copy of a conversation's metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSnapshot {
    pub id: ConversationId,
    pub display_name: Option<String>,
    pub participants: Vec<HandleId>,
    pub unread_count: u64,
    pub join_state: JoinState,
    pub properties: ConversationProperties,
    pub message_count: u64,
}

/// A contact snapshot supplied by the contact directory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nicknames: Vec<String>,
    pub handles: Vec<HandleId>,
}

/// An attachment record, searchable through the query protocol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub guid: String,
    pub conversation: ConversationId,
    pub mime_type: Option<String>,
    pub uti: Option<String>,
    pub filename: Option<String>,
    pub total_bytes: u64,
}

// =============================================================================
// Tests
// =============================================================================
