//! Builder for [`Client`]
//!
//! ```rust
//! use std::sync::Arc;
//! use roomkit_client_core::{ClientBuilder, LoopbackTransport};
//!
//! # tokio_test::block_on(async {
//! let client = ClientBuilder::new()
//!     .transport(Arc::new(LoopbackTransport::new()))
//!     .stats_interval_ms(2_000)
//!     .build()
//!     .unwrap();
//! assert_eq!(client.config().stats_interval_ms, 2_000);
//! # })
//! ```

use std::sync::Arc;

use crate::error::{ClientError, ClientResult};
use crate::events::{ClientEventHandler, EventSubscription};
use crate::transport::SignalingTransport;

use super::config::ClientConfig;
use super::manager::Client;

pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn SignalingTransport>>,
    subscriptions: Vec<EventSubscription>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            transport: None,
            subscriptions: Vec::new(),
        }
    }

    /// Transport carrying signaling to the room (required)
    pub fn transport(mut self, transport: Arc<dyn SignalingTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stats_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.stats_interval_ms = interval_ms;
        self
    }

    pub fn signaling_url(mut self, url: impl Into<String>) -> Self {
        self.config.default_signaling_url = Some(url.into());
        self
    }

    /// Handler registered before the first event can fire
    pub fn event_handler(mut self, handler: Arc<dyn ClientEventHandler>) -> Self {
        self.subscriptions.push(EventSubscription::all_events(handler));
        self
    }

    pub fn subscription(mut self, subscription: EventSubscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Build the client; must run inside a tokio runtime
    pub fn build(self) -> ClientResult<Client> {
        let transport = self.transport.ok_or_else(|| ClientError::MissingConfiguration {
            field: "transport".to_string(),
        })?;

        let client = Client::new(transport, self.config)?;
        for subscription in self.subscriptions {
            client.subscribe(subscription);
        }
        Ok(client)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
