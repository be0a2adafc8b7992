//! The conversation registry: single authority over per-conversation state.
//!
//! Routes inbound updates into the owning conversation's message map and
//! translates every reconciliation outcome into the correct event variant.
//! Updates to the same conversation are serialized by that conversation's
//! lock; updates to different conversations proceed fully concurrently.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, warn};

use courier_bus::EventBus;
use courier_core::events::{
    ConversationPropertiesChange, Event, ParticipantChange, RemovedItems, StatusChange,
};
use courier_core::types::{
    Conversation, ConversationId, ConversationProperties, ConversationSnapshot, DeliveryStatus,
    HandleId, JoinState, Message, MessageGuid,
};
use courier_core::{CourierError, Result};

use crate::reconcile::reconcile;
use crate::update::RawUpdate;

/// Conversation metadata pushed by the external conversation directory.
#[derive(Clone, Debug)]
pub struct ConversationMetadata {
    pub id: ConversationId,
    pub display_name: Option<String>,
    pub participants: Vec<HandleId>,
    pub unread_count: u64,
    pub join_state: JoinState,
    pub properties: ConversationProperties,
}

/// Owns the set of conversations and publishes every state change.
pub struct ConversationRegistry {
    conversations: RwLock<HashMap<ConversationId, Arc<Mutex<Conversation>>>>,
    bus: Arc<EventBus>,
}

impl ConversationRegistry {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            bus,
        }
    }

    /// Resolve a conversation, creating it on first reference.
    ///
    /// Insert-if-absent happens under the index write lock, so concurrent
    /// first touches of the same id converge on one instance.
    fn conversation(&self, id: &ConversationId) -> Arc<Mutex<Conversation>> {
        if let Some(conversation) = self
            .conversations
            .read()
            .expect("conversation index poisoned")
            .get(id)
        {
            return conversation.clone();
        }
        let mut index = self
            .conversations
            .write()
            .expect("conversation index poisoned");
        index
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(Conversation::new(id.clone()))))
            .clone()
    }

    /// Resolve a conversation that must already exist.
    fn existing(&self, id: &ConversationId) -> Result<Arc<Mutex<Conversation>>> {
        self.conversations
            .read()
            .expect("conversation index poisoned")
            .get(id)
            .cloned()
            .ok_or_else(|| CourierError::NotFound(format!("conversation {}", id)))
    }

    /// Route one inbound update into its conversation.
    ///
    /// An update without a derivable GUID is dropped (logged, no event, no
    /// error). Otherwise the message is reconciled into the map and the
    /// outcome published: `itemsReceived` when the GUID was new,
    /// `itemsUpdated` when it already existed. Returns the canonical
    /// resulting message.
    pub fn handle(&self, conversation_id: &ConversationId, update: RawUpdate) -> Option<Message> {
        let conversation = self.conversation(conversation_id);
        let Some(guid) = update.guid() else {
            warn!(conversation = %conversation_id, update = %update, "dropping update without a derivable guid");
            return None;
        };

        let (message, existed) = {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            // Take ownership of the prior entry; its presence decides the
            // event variant before the merge runs.
            let prior = conversation.messages.remove(&guid);
            let existed = prior.is_some();
            let message = reconcile(&guid, update, prior);
            conversation.messages.insert(guid.clone(), message.clone());
            (message, existed)
        };

        debug!(conversation = %conversation_id, guid = %guid, existed, "message reconciled");
        if existed {
            self.bus.publish(Event::ItemsUpdated(vec![message.clone()]));
        } else {
            self.bus.publish(Event::ItemsReceived(vec![message.clone()]));
        }
        Some(message)
    }

    /// Apply a delivery-status transition to an existing message.
    pub fn handle_status(&self, change: StatusChange) -> Result<Message> {
        let conversation = self.existing(&change.conversation)?;
        let message = {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            let message = conversation.messages.get_mut(&change.guid).ok_or_else(|| {
                CourierError::NotFound(format!(
                    "message {} in conversation {}",
                    change.guid, change.conversation
                ))
            })?;
            message.status = change.status;
            match change.status {
                DeliveryStatus::Delivered => {
                    message.time_delivered = change.timestamp.or(message.time_delivered);
                }
                DeliveryStatus::Read => {
                    message.time_read = change.timestamp.or(message.time_read);
                }
                DeliveryStatus::Sent | DeliveryStatus::Failed => {}
            }
            message.clone()
        };

        self.bus.publish(Event::ItemStatusChanged(change));
        Ok(message)
    }

    /// Remove messages by GUID. GUIDs not present are skipped; the
    /// published event lists only what was actually removed.
    pub fn remove_messages(
        &self,
        conversation_id: &ConversationId,
        guids: &[MessageGuid],
    ) -> Result<Vec<MessageGuid>> {
        let conversation = self.existing(conversation_id)?;
        let removed: Vec<MessageGuid> = {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            guids
                .iter()
                .filter(|guid| conversation.messages.remove(*guid).is_some())
                .cloned()
                .collect()
        };

        if !removed.is_empty() {
            info!(conversation = %conversation_id, count = removed.len(), "messages removed");
            self.bus.publish(Event::ItemsRemoved(RemovedItems {
                conversation: conversation_id.clone(),
                guids: removed.clone(),
            }));
        }
        Ok(removed)
    }

    /// Create or update a conversation from directory metadata.
    ///
    /// This is the only path that publishes `conversationCreated`; lazy
    /// creation inside [`handle`](Self::handle) is an addressing detail of
    /// the update path and stays silent.
    pub fn upsert_conversation(&self, metadata: ConversationMetadata) -> ConversationSnapshot {
        let (conversation, created) = {
            let mut index = self
                .conversations
                .write()
                .expect("conversation index poisoned");
            match index.entry(metadata.id.clone()) {
                Entry::Occupied(entry) => (entry.get().clone(), false),
                Entry::Vacant(entry) => {
                    let conversation =
                        Arc::new(Mutex::new(Conversation::new(metadata.id.clone())));
                    entry.insert(conversation.clone());
                    (conversation, true)
                }
            }
        };

        let snapshot = {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            conversation.display_name = metadata.display_name;
            conversation.participants = metadata.participants;
            conversation.unread_count = metadata.unread_count;
            conversation.join_state = metadata.join_state;
            conversation.properties = metadata.properties;
            conversation.snapshot()
        };

        if created {
            info!(conversation = %snapshot.id, "conversation created");
            self.bus
                .publish(Event::ConversationCreated(snapshot.clone()));
        } else {
            self.bus
                .publish(Event::ConversationChanged(snapshot.clone()));
        }
        snapshot
    }

    /// Remove a conversation entirely. Invoked by the external directory;
    /// nothing inside this core calls it spontaneously.
    pub fn remove_conversation(&self, id: &ConversationId) -> Result<()> {
        let removed = self
            .conversations
            .write()
            .expect("conversation index poisoned")
            .remove(id);
        if removed.is_none() {
            return Err(CourierError::NotFound(format!("conversation {}", id)));
        }
        info!(conversation = %id, "conversation removed");
        self.bus.publish(Event::ConversationRemoved(id.clone()));
        Ok(())
    }

    pub fn set_display_name(
        &self,
        id: &ConversationId,
        display_name: Option<String>,
    ) -> Result<()> {
        let conversation = self.existing(id)?;
        let snapshot = {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            if conversation.display_name == display_name {
                return Ok(());
            }
            conversation.display_name = display_name;
            conversation.snapshot()
        };
        self.bus
            .publish(Event::ConversationDisplayNameChanged(snapshot));
        Ok(())
    }

    pub fn set_join_state(&self, id: &ConversationId, join_state: JoinState) -> Result<()> {
        let conversation = self.existing(id)?;
        let snapshot = {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            if conversation.join_state == join_state {
                return Ok(());
            }
            conversation.join_state = join_state;
            conversation.snapshot()
        };
        self.bus
            .publish(Event::ConversationJoinStateChanged(snapshot));
        Ok(())
    }

    pub fn set_unread_count(&self, id: &ConversationId, unread_count: u64) -> Result<()> {
        let conversation = self.existing(id)?;
        let snapshot = {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            if conversation.unread_count == unread_count {
                return Ok(());
            }
            conversation.unread_count = unread_count;
            conversation.snapshot()
        };
        self.bus
            .publish(Event::ConversationUnreadCountChanged(snapshot));
        Ok(())
    }

    pub fn set_properties(
        &self,
        id: &ConversationId,
        properties: ConversationProperties,
    ) -> Result<()> {
        let conversation = self.existing(id)?;
        {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            if conversation.properties == properties {
                return Ok(());
            }
            conversation.properties = properties;
        }
        self.bus
            .publish(Event::ConversationPropertiesChanged(
                ConversationPropertiesChange {
                    conversation: id.clone(),
                    properties,
                },
            ));
        Ok(())
    }

    pub fn set_participants(&self, id: &ConversationId, participants: Vec<HandleId>) -> Result<()> {
        let conversation = self.existing(id)?;
        {
            let mut conversation = conversation.lock().expect("conversation state poisoned");
            if conversation.participants == participants {
                return Ok(());
            }
            conversation.participants = participants.clone();
        }
        self.bus.publish(Event::ParticipantsChanged(ParticipantChange {
            conversation: id.clone(),
            handles: participants,
        }));
        Ok(())
    }

    /// Owned snapshot of one conversation's metadata.
    pub fn snapshot(&self, id: &ConversationId) -> Option<ConversationSnapshot> {
        let conversation = self
            .conversations
            .read()
            .expect("conversation index poisoned")
            .get(id)
            .cloned()?;
        let conversation = conversation.lock().expect("conversation state poisoned");
        Some(conversation.snapshot())
    }

    /// Owned copy of one message.
    pub fn message(&self, id: &ConversationId, guid: &MessageGuid) -> Option<Message> {
        let conversation = self
            .conversations
            .read()
            .expect("conversation index poisoned")
            .get(id)
            .cloned()?;
        let conversation = conversation.lock().expect("conversation state poisoned");
        conversation.messages.get(guid).cloned()
    }

    pub fn conversation_count(&self) -> usize {
        self.conversations
            .read()
            .expect("conversation index poisoned")
            .len()
    }

    /// The `limit` newest messages across all conversations, newest first.
    /// Used when assembling bootstrap snapshots.
    pub fn recent_messages(&self, limit: usize) -> Vec<Message> {
        let conversations: Vec<Arc<Mutex<Conversation>>> = self
            .conversations
            .read()
            .expect("conversation index poisoned")
            .values()
            .cloned()
            .collect();

        let mut messages: Vec<Message> = Vec::new();
        for conversation in conversations {
            let conversation = conversation.lock().expect("conversation state poisoned");
            messages.extend(conversation.messages.values().cloned());
        }
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        messages.truncate(limit);
        messages
    }
}
