//! Per-channel contract consumed by the core (spec.md §6). Each channel
//! implementation owns its own socket/ICE state; lifecycle methods run on
//! the worker thread, never under the registry or candidate-queue mutex
//! except during the brief `insert` inside `create_channel` on the worker.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bridge::WorkerMessage;
use crate::candidate::Candidate;

/// Events a channel implementation raises back into the transport. These
/// fire on the worker thread (spec.md §4.6 "Channel-originated callbacks").
/// This is the Rust realization of design note §9's "replace signals/slots
/// with explicit callback registration": rather than a `sigslot`-style
/// connection, the channel is handed a sink at construction time and calls
/// it directly.
#[derive(Debug)]
pub enum ChannelEvent {
    ReadableStateChanged,
    WritableStateChanged,
    RequestSignaling,
    CandidateReady(Candidate),
}

/// A cheaply-cloneable handle a channel implementation uses to notify the
/// transport of state changes. Bound to one channel name so the worker can
/// attribute the event without the channel needing to know about the
/// registry. Posts directly onto the worker's `WorkerMessage` queue so
/// channel events interleave with signaling-side commands in strict send
/// order, the way the original's single worker OS thread did.
#[derive(Clone)]
pub struct ChannelEventSink {
    pub(crate) name: String,
    pub(crate) tx: mpsc::UnboundedSender<WorkerMessage>,
}

impl ChannelEventSink {
    pub(crate) fn new(name: String, tx: mpsc::UnboundedSender<WorkerMessage>) -> Self {
        ChannelEventSink { name, tx }
    }

    fn emit(&self, event: ChannelEvent) {
        // The worker task outlives every channel it owns; a send failure
        // here only happens during final teardown and is not actionable.
        let _ = self.tx.send(WorkerMessage::ChannelEvent(self.name.clone(), event));
    }

    pub fn readable_state_changed(&self) {
        self.emit(ChannelEvent::ReadableStateChanged);
    }

    pub fn writable_state_changed(&self) {
        self.emit(ChannelEvent::WritableStateChanged);
    }

    pub fn request_signaling(&self) {
        self.emit(ChannelEvent::RequestSignaling);
    }

    pub fn candidate_ready(&self, candidate: Candidate) {
        self.emit(ChannelEvent::CandidateReady(candidate));
    }
}

/// The contract a transport channel implementation must provide (spec.md
/// §6). Connectivity-establishment semantics (real ICE, real sockets) are
/// out of scope for this core — see spec.md §1 Non-goals.
#[async_trait]
pub trait TransportChannel: Send + Sync {
    /// Begins connectivity establishment. Called on the worker thread.
    async fn connect(&self);

    /// Aborts any in-flight connectivity establishment and returns the
    /// channel to its pre-connect state. Called on the worker thread.
    async fn reset(&self);

    /// Notifies the channel that the signaling path is ready to carry
    /// messages. Called on the worker thread.
    async fn on_signaling_ready(&self);

    /// Delivers a remote candidate discovered via signaling. Called on the
    /// worker thread; never called after the channel has been destroyed.
    async fn on_candidate(&self, candidate: &Candidate);

    /// Word-sized snapshot; safe to read under the registry mutex.
    fn readable(&self) -> bool;

    /// Word-sized snapshot; safe to read under the registry mutex.
    fn writable(&self) -> bool;
}
