pub mod bus;

pub use bus::{BootstrapSource, EventBus, Subscription, SubscriptionId};
