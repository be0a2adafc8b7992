//! Service health tracking across two independent axes.
//!
//! The platform connectivity/authentication source pushes observations in;
//! only actual transitions produce events. Every `healthChanged` event
//! carries the complete current pair, so a subscriber attaching mid-stream
//! never needs prior history.

use std::sync::{Arc, Mutex};

use tracing::info;

use courier_bus::EventBus;
use courier_core::types::{AuthenticationState, ConnectionState, HealthState};
use courier_core::Event;

/// Change-detected health state, shared with the bootstrap assembler.
pub struct HealthMonitor {
    state: Mutex<HealthState>,
    bus: Arc<EventBus>,
}

impl HealthMonitor {
    /// Starts at `unknown` / `connecting` until the signal source reports.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            state: Mutex::new(HealthState::default()),
            bus,
        }
    }

    /// The complete current pair.
    pub fn current(&self) -> HealthState {
        *self.state.lock().expect("health state poisoned")
    }

    /// Record an observation of the authentication axis. Emits one
    /// `healthChanged` event on transition, nothing when unchanged.
    pub fn observe_authentication(&self, observed: AuthenticationState) {
        let snapshot = {
            let mut state = self.state.lock().expect("health state poisoned");
            if state.authentication_state == observed {
                return;
            }
            info!(from = ?state.authentication_state, to = ?observed, "authentication state changed");
            state.authentication_state = observed;
            *state
        };
        self.bus.publish(Event::HealthChanged(snapshot));
    }

    /// Record an observation of the connection axis. Emits one
    /// `healthChanged` event on transition, nothing when unchanged.
    pub fn observe_connection(&self, observed: ConnectionState) {
        let snapshot = {
            let mut state = self.state.lock().expect("health state poisoned");
            if state.connection_state == observed {
                return;
            }
            info!(from = ?state.connection_state, to = ?observed, "connection state changed");
            state.connection_state = observed;
            *state
        };
        self.bus.publish(Event::HealthChanged(snapshot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use courier_bus::{BootstrapSource, Subscription};
    use courier_core::events::BootstrapData;
    use courier_core::Result;

    struct NullSource;

    #[async_trait]
    impl BootstrapSource for NullSource {
        async fn bootstrap(&self) -> Result<BootstrapData> {
            Ok(BootstrapData {
                conversations: vec![],
                total_conversations: 0,
                contacts: vec![],
                messages: None,
                health: HealthState::default(),
            })
        }
    }

    async fn attach(bus: &EventBus) -> Subscription {
        let mut sub = bus.subscribe(&NullSource).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().event_name(), "bootstrap");
        sub
    }

    #[tokio::test]
    async fn test_repeated_observation_emits_nothing() {
        let bus = Arc::new(EventBus::new(16));
        let monitor = HealthMonitor::new(bus.clone());
        monitor.observe_authentication(AuthenticationState::Authenticated);
        let mut sub = attach(&bus).await;

        monitor.observe_authentication(AuthenticationState::Authenticated);
        monitor.observe_authentication(AuthenticationState::Authenticated);
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_transition_emits_complete_pair() {
        let bus = Arc::new(EventBus::new(16));
        let monitor = HealthMonitor::new(bus.clone());
        monitor.observe_authentication(AuthenticationState::Authenticated);
        monitor.observe_connection(ConnectionState::Connected);
        let mut sub = attach(&bus).await;

        monitor.observe_authentication(AuthenticationState::Unauthenticated);

        match sub.recv().await.unwrap() {
            Event::HealthChanged(health) => {
                assert_eq!(
                    health.authentication_state,
                    AuthenticationState::Unauthenticated
                );
                // The other axis rides along unchanged.
                assert_eq!(health.connection_state, ConnectionState::Connected);
            }
            other => panic!("expected healthChanged, got {}", other),
        }
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_axes_are_independent() {
        let bus = Arc::new(EventBus::new(16));
        let monitor = HealthMonitor::new(bus.clone());
        let mut sub = attach(&bus).await;

        monitor.observe_connection(ConnectionState::Connected);
        monitor.observe_connection(ConnectionState::Disconnected);
        monitor.observe_authentication(AuthenticationState::Authenticated);

        let mut names = Vec::new();
        for _ in 0..3 {
            names.push(sub.recv().await.unwrap().event_name());
        }
        assert_eq!(
            names,
            vec!["healthChanged", "healthChanged", "healthChanged"]
        );
        assert!(sub.try_recv().is_none());

        let current = monitor.current();
        assert_eq!(current.connection_state, ConnectionState::Disconnected);
        assert_eq!(
            current.authentication_state,
            AuthenticationState::Authenticated
        );
    }
}
