//! Emitted signals (spec.md §4.6) and the AggregateState rollup (C5). Signal
//! handlers are single-slot registrations — `Arc<tokio::sync::Mutex<Option<Handler>>>`
//! — mirroring `OnConnectionStateChangeHdlrFn` / `on_connection_state_change`
//! in `ice_transport/mod.rs`. Invocation only ever happens on the signaling
//! thread, so no synchronization is needed beyond the handler slot itself
//! (design note §9).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::candidate::Candidate;
use crate::channel::TransportChannel;
use crate::registry::ChannelRegistry;

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

pub type ConnectingHandlerFn = Box<dyn FnMut() -> BoxFuture + Send>;
pub type ReadableStateHandlerFn = Box<dyn FnMut(bool) -> BoxFuture + Send>;
pub type WritableStateHandlerFn = Box<dyn FnMut(bool) -> BoxFuture + Send>;
pub type RequestSignalingHandlerFn = Box<dyn FnMut() -> BoxFuture + Send>;
pub type CandidatesReadyHandlerFn = Box<dyn FnMut(Vec<Candidate>) -> BoxFuture + Send>;

#[derive(Default)]
pub struct TransportEvents {
    pub(crate) on_connecting: Mutex<Option<ConnectingHandlerFn>>,
    pub(crate) on_readable_state: Mutex<Option<ReadableStateHandlerFn>>,
    pub(crate) on_writable_state: Mutex<Option<WritableStateHandlerFn>>,
    pub(crate) on_request_signaling: Mutex<Option<RequestSignalingHandlerFn>>,
    pub(crate) on_candidates_ready: Mutex<Option<CandidatesReadyHandlerFn>>,
}

impl TransportEvents {
    pub async fn fire_connecting(&self) {
        let mut slot = self.on_connecting.lock().await;
        if let Some(handler) = &mut *slot {
            handler().await;
        }
    }

    pub async fn fire_readable_state(&self, readable: bool) {
        let mut slot = self.on_readable_state.lock().await;
        if let Some(handler) = &mut *slot {
            handler(readable).await;
        }
    }

    pub async fn fire_writable_state(&self, writable: bool) {
        let mut slot = self.on_writable_state.lock().await;
        if let Some(handler) = &mut *slot {
            handler(writable).await;
        }
    }

    pub async fn fire_request_signaling(&self) {
        let mut slot = self.on_request_signaling.lock().await;
        if let Some(handler) = &mut *slot {
            handler().await;
        }
    }

    pub async fn fire_candidates_ready(&self, candidates: Vec<Candidate>) {
        let mut slot = self.on_candidates_ready.lock().await;
        if let Some(handler) = &mut *slot {
            handler(candidates).await;
        }
    }
}

/// AggregateState (C5): `readable = ∃ ch. ch.readable`, `writable = ∃ ch.
/// ch.writable`. Reading per-channel booleans under the registry mutex is
/// acceptable because the fields are word-sized snapshots (spec.md §4.4).
pub fn recompute_rollup(registry: &ChannelRegistry, read: bool) -> bool {
    registry
        .snapshot()
        .iter()
        .any(|(_, ch): &(String, Arc<dyn TransportChannel>)| {
            if read {
                ch.readable()
            } else {
                ch.writable()
            }
        })
}
