//! Subclass hooks required by the core (spec.md §6). The subclass implements
//! the wire-protocol specifics (what kind of channel a given content type
//! needs, how to wire up the signaling path); the core implements the
//! lifecycle and threading.

use std::sync::Arc;

use async_trait::async_trait;

use crate::channel::{ChannelEventSink, TransportChannel};

#[async_trait]
pub trait TransportSubclass: Send + Sync {
    /// Builds a new channel implementation for `name`/`content_type`. Called
    /// on the worker thread, before the channel is registered — the
    /// returned channel must use `sink` to report state changes once it is
    /// handed back to the transport.
    async fn create_transport_channel(
        &self,
        name: &str,
        content_type: &str,
        sink: ChannelEventSink,
    ) -> Arc<dyn TransportChannel>;

    /// Releases a channel built by `create_transport_channel`. Called on the
    /// worker thread, after the channel has been removed from the registry.
    async fn destroy_transport_channel(&self, channel: Arc<dyn TransportChannel>);

    /// Called on the signaling thread immediately after `Transport` has
    /// posted `ONSIGNALINGREADY` to the worker.
    fn on_transport_signaling_ready(&self) {}
}
