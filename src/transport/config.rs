//! Ambient configuration knobs (spec.md §6): no environment variables, no
//! CLI, no persisted state at this layer — just a plain config struct
//! supplied at construction.

use std::sync::Arc;

/// Opaque handle to a port allocator, passed through to new channels
/// unexamined. The socket/port allocator itself is out of scope for this
/// core (spec.md §1) — this trait exists only so `Transport` has something
/// concrete to hold and hand to `TransportSubclass::create_transport_channel`.
pub trait PortAllocator: Send + Sync {}

/// A `PortAllocator` that hands out nothing; useful for tests and for
/// transports whose subclass ignores the allocator entirely.
#[derive(Debug, Default)]
pub struct NullPortAllocator;

impl PortAllocator for NullPortAllocator {}

#[derive(Clone)]
pub struct TransportConfig {
    /// Identifies the transport variant (e.g. a protocol tag); immutable
    /// after construction, surfaced to callers for routing decisions.
    pub transport_type: String,
    pub allocator: Arc<dyn PortAllocator>,
    /// When true, the candidate validator permits loopback/link-local
    /// addresses. Defaults to `false`.
    pub allow_local_ips: bool,
}

impl TransportConfig {
    pub fn new(transport_type: impl Into<String>, allocator: Arc<dyn PortAllocator>) -> Self {
        TransportConfig {
            transport_type: transport_type.into(),
            allocator,
            allow_local_ips: false,
        }
    }

    pub fn allow_local_ips(mut self, allow: bool) -> Self {
        self.allow_local_ips = allow;
        self
    }
}
