use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Contact, ConversationId, ConversationProperties, ConversationSnapshot, DeliveryStatus,
    HandleId, HealthState, Message, MessageGuid,
};

/// All state-change notifications Courier emits.
///
/// Every variant carries an owned snapshot of its payload — never a
/// reference into live registry state — so a subscriber can never observe
/// an in-progress mutation. The wire layout is adjacently tagged
/// (`type` + `payload`) with camelCase tags; both the tag names and the
/// payload field layouts are a stability contract with external
/// subscribers and must not change shape between versions.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// Full snapshot synthesized once for each newly attached subscriber.
    Bootstrap(BootstrapData),
    /// Messages reconciled for the first time.
    ItemsReceived(Vec<Message>),
    /// Messages that already existed and were mutated.
    ItemsUpdated(Vec<Message>),
    /// A delivery-status transition on one message.
    ItemStatusChanged(StatusChange),
    /// Messages removed from a conversation, by GUID.
    ItemsRemoved(RemovedItems),
    ParticipantsChanged(ParticipantChange),
    ConversationCreated(ConversationSnapshot),
    ConversationChanged(ConversationSnapshot),
    /// Carries the id of the removed conversation.
    ConversationRemoved(ConversationId),
    ConversationDisplayNameChanged(ConversationSnapshot),
    ConversationJoinStateChanged(ConversationSnapshot),
    ConversationUnreadCountChanged(ConversationSnapshot),
    ConversationPropertiesChanged(ConversationPropertiesChange),
    ContactCreated(Contact),
    ContactUpdated(Contact),
    /// Carries the id of the removed contact.
    ContactRemoved(String),
    BlockListUpdated(BlockList),
    HealthChanged(HealthState),
}

impl Event {
    /// The stable wire tag for this variant.
    pub fn event_name(&self) -> &'static str {
        match self {
            Event::Bootstrap(_) => "bootstrap",
            Event::ItemsReceived(_) => "itemsReceived",
            Event::ItemsUpdated(_) => "itemsUpdated",
            Event::ItemStatusChanged(_) => "itemStatusChanged",
            Event::ItemsRemoved(_) => "itemsRemoved",
            Event::ParticipantsChanged(_) => "participantsChanged",
            Event::ConversationCreated(_) => "conversationCreated",
            Event::ConversationChanged(_) => "conversationChanged",
            Event::ConversationRemoved(_) => "conversationRemoved",
            Event::ConversationDisplayNameChanged(_) => "conversationDisplayNameChanged",
            Event::ConversationJoinStateChanged(_) => "conversationJoinStateChanged",
            Event::ConversationUnreadCountChanged(_) => "conversationUnreadCountChanged",
            Event::ConversationPropertiesChanged(_) => "conversationPropertiesChanged",
            Event::ContactCreated(_) => "contactCreated",
            Event::ContactUpdated(_) => "contactUpdated",
            Event::ContactRemoved(_) => "contactRemoved",
            Event::BlockListUpdated(_) => "blockListUpdated",
            Event::HealthChanged(_) => "healthChanged",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Bootstrap(data) => write!(
                f,
                "bootstrap ({} conversations, {} contacts)",
                data.conversations.len(),
                data.contacts.len()
            ),
            Event::ItemsReceived(items) => write!(f, "itemsReceived ({} items)", items.len()),
            Event::ItemsUpdated(items) => write!(f, "itemsUpdated ({} items)", items.len()),
            Event::ItemStatusChanged(change) => write!(
                f,
                "itemStatusChanged ({} -> {})",
                change.guid,
                change.status.as_str()
            ),
            Event::ItemsRemoved(removed) => write!(
                f,
                "itemsRemoved ({} items from {})",
                removed.guids.len(),
                removed.conversation
            ),
            Event::ParticipantsChanged(change) => write!(
                f,
                "participantsChanged ({}, {} handles)",
                change.conversation,
                change.handles.len()
            ),
            Event::ConversationCreated(snapshot) => {
                write!(f, "conversationCreated ({})", snapshot.id)
            }
            Event::ConversationChanged(snapshot) => {
                write!(f, "conversationChanged ({})", snapshot.id)
            }
            Event::ConversationRemoved(id) => write!(f, "conversationRemoved ({})", id),
            Event::ConversationDisplayNameChanged(snapshot) => {
                write!(f, "conversationDisplayNameChanged ({})", snapshot.id)
            }
            Event::ConversationJoinStateChanged(snapshot) => {
                write!(f, "conversationJoinStateChanged ({})", snapshot.id)
            }
            Event::ConversationUnreadCountChanged(snapshot) => write!(
                f,
                "conversationUnreadCountChanged ({}, {} unread)",
                snapshot.id, snapshot.unread_count
            ),
            Event::ConversationPropertiesChanged(change) => {
                write!(f, "conversationPropertiesChanged ({})", change.conversation)
            }
            Event::ContactCreated(contact) => write!(f, "contactCreated ({})", contact.id),
            Event::ContactUpdated(contact) => write!(f, "contactUpdated ({})", contact.id),
            Event::ContactRemoved(id) => write!(f, "contactRemoved ({})", id),
            Event::BlockListUpdated(list) => {
                write!(f, "blockListUpdated ({} handles)", list.handles.len())
            }
            Event::HealthChanged(health) => write!(
                f,
                "healthChanged ({:?}/{:?})",
                health.authentication_state, health.connection_state
            ),
        }
    }
}

/// Payload of the one-time snapshot delivered to a new subscriber.
///
/// Assembled on demand from the registry and the external directories —
/// never cached between subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapData {
    pub conversations: Vec<ConversationSnapshot>,
    pub total_conversations: u64,
    pub contacts: Vec<Contact>,
    pub messages: Option<Vec<Message>>,
    pub health: HealthState,
}

/// A delivery-status transition for one message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub conversation: ConversationId,
    pub guid: MessageGuid,
    pub status: DeliveryStatus,
    pub timestamp: Option<DateTime<Utc>>,
}

/// GUIDs removed from one conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedItems {
    pub conversation: ConversationId,
    pub guids: Vec<MessageGuid>,
}

/// The participant set of a conversation after a membership change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantChange {
    pub conversation: ConversationId,
    pub handles: Vec<HandleId>,
}

/// Conversation-level properties after a change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPropertiesChange {
    pub conversation: ConversationId,
    pub properties: ConversationProperties,
}

/// The complete blocked-handle list after an update.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockList {
    pub handles: Vec<HandleId>,
}
