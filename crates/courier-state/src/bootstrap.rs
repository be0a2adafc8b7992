//! Bootstrap snapshot assembly for new subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use courier_bus::BootstrapSource;
use courier_core::config::BootstrapConfig;
use courier_core::events::BootstrapData;
use courier_core::types::{Contact, ConversationSnapshot};
use courier_core::Result;

use crate::health::HealthMonitor;
use crate::registry::ConversationRegistry;

/// External contact directory. Failures surface as
/// [`CourierError::Upstream`](courier_core::CourierError::Upstream).
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    async fn contacts(&self, limit: Option<u64>) -> Result<Vec<Contact>>;
}

/// External conversation directory: the authority on conversation ordering
/// and totals.
#[async_trait]
pub trait ConversationDirectory: Send + Sync {
    /// Conversation snapshots sorted most-recent-first.
    async fn sorted_conversations(&self, limit: Option<u64>)
        -> Result<Vec<ConversationSnapshot>>;

    async fn total_conversations(&self) -> Result<u64>;
}

/// Assembles the one-time snapshot delivered to each new subscriber.
///
/// Every call pulls live state from its collaborators; nothing is cached
/// between subscribers.
pub struct Bootstrapper {
    registry: Arc<ConversationRegistry>,
    conversations: Arc<dyn ConversationDirectory>,
    contacts: Arc<dyn ContactDirectory>,
    health: Arc<HealthMonitor>,
    config: BootstrapConfig,
}

impl Bootstrapper {
    pub fn new(
        registry: Arc<ConversationRegistry>,
        conversations: Arc<dyn ConversationDirectory>,
        contacts: Arc<dyn ContactDirectory>,
        health: Arc<HealthMonitor>,
        config: BootstrapConfig,
    ) -> Self {
        Self {
            registry,
            conversations,
            contacts,
            health,
            config,
        }
    }
}

#[async_trait]
impl BootstrapSource for Bootstrapper {
    async fn bootstrap(&self) -> Result<BootstrapData> {
        let conversations = self
            .conversations
            .sorted_conversations(self.config.conversation_limit)
            .await?;
        let total_conversations = self.conversations.total_conversations().await?;
        let contacts = self.contacts.contacts(self.config.contact_limit).await?;
        let messages = if self.config.recent_messages > 0 {
            Some(
                self.registry
                    .recent_messages(self.config.recent_messages as usize),
            )
        } else {
            None
        };

        debug!(
            conversations = conversations.len(),
            total_conversations,
            contacts = contacts.len(),
            "bootstrap snapshot assembled"
        );
        Ok(BootstrapData {
            conversations,
            total_conversations,
            contacts,
            messages,
            health: self.health.current(),
        })
    }
}
