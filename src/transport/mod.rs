//! Transport façade (C7): public operations, cross-thread dispatch, and the
//! idle/connecting state machine described in spec.md §4.6.

pub mod config;
pub mod events;
pub mod subclass;

#[cfg(test)]
mod transport_test;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};

use crate::bridge::{SignalingMessage, WorkerMessage};
use crate::candidate::{Candidate, ChannelParams};
use crate::candidate_queue::CandidateQueue;
use crate::channel::{ChannelEvent, ChannelEventSink, TransportChannel};
use crate::error::ParseError;
use crate::registry::ChannelRegistry;
use crate::validator;

pub use config::{NullPortAllocator, PortAllocator, TransportConfig};
pub use events::{
    CandidatesReadyHandlerFn, ConnectingHandlerFn, ReadableStateHandlerFn,
    RequestSignalingHandlerFn, TransportEvents, WritableStateHandlerFn,
};
pub use subclass::TransportSubclass;

/// A thread-safe container of named transport channels: drives their
/// connectivity establishment, aggregates their readable/writable state, and
/// brokers candidate exchange with a remote peer. See spec.md §1.
pub struct Transport {
    transport_type: String,
    allocator: Arc<dyn PortAllocator>,
    allow_local_ips: bool,

    destroyed: AtomicBool,
    readable: AtomicBool,
    writable: AtomicBool,
    connect_requested: AtomicBool,
    /// Set while a READSTATE/WRITESTATE ping is already queued for the
    /// signaling thread, so a burst of channel state flips collapses to a
    /// single rollup recomputation (spec.md §4.4 Rationale).
    read_state_pending: AtomicBool,
    write_state_pending: AtomicBool,

    channels: ChannelRegistry,
    ready_candidates: CandidateQueue,
    events: TransportEvents,
    subclass: Arc<dyn TransportSubclass>,

    worker_tx: mpsc::UnboundedSender<WorkerMessage>,
    /// Taken exactly once by `run_signaling_loop`, the way
    /// `peer_connection/driver.rs` takes its `data_rx`/`rtp_rx` receivers.
    signaling_rx: Mutex<Option<mpsc::UnboundedReceiver<SignalingMessage>>>,
}

impl Transport {
    pub fn new(config: TransportConfig, subclass: Arc<dyn TransportSubclass>) -> Arc<Self> {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let (signaling_tx, signaling_rx) = mpsc::unbounded_channel();

        let transport = Arc::new(Transport {
            transport_type: config.transport_type,
            allocator: config.allocator,
            allow_local_ips: config.allow_local_ips,
            destroyed: AtomicBool::new(false),
            readable: AtomicBool::new(false),
            writable: AtomicBool::new(false),
            connect_requested: AtomicBool::new(false),
            read_state_pending: AtomicBool::new(false),
            write_state_pending: AtomicBool::new(false),
            channels: ChannelRegistry::new(),
            ready_candidates: CandidateQueue::new(),
            events: TransportEvents::default(),
            subclass,
            worker_tx,
            signaling_rx: Mutex::new(Some(signaling_rx)),
        });

        let worker_transport = Arc::clone(&transport);
        tokio::spawn(async move {
            worker_transport.run_worker_loop(worker_rx, signaling_tx).await;
        });

        let signaling_transport = Arc::clone(&transport);
        tokio::spawn(async move {
            signaling_transport.run_signaling_loop().await;
        });

        transport
    }

    // ---- configuration accessors -----------------------------------

    pub fn transport_type(&self) -> &str {
        &self.transport_type
    }

    pub fn allocator(&self) -> &Arc<dyn PortAllocator> {
        &self.allocator
    }

    pub fn allow_local_ips(&self) -> bool {
        self.allow_local_ips
    }

    pub fn readable(&self) -> bool {
        self.readable.load(Ordering::SeqCst)
    }

    pub fn writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }

    pub fn connect_requested(&self) -> bool {
        self.connect_requested.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// CandidateValidator (C6), bound to this transport's `allow_local_ips`.
    pub fn validate_candidate(&self, candidate: &Candidate) -> Result<(), ParseError> {
        validator::validate(candidate, self.allow_local_ips)
    }

    // ---- signal registration (signaling thread only) -----------------

    pub async fn on_connecting(&self, handler: ConnectingHandlerFn) {
        *self.events.on_connecting.lock().await = Some(handler);
    }

    /// Fires on readable-rollup transitions. Per spec.md design note §9(a):
    /// the "connecting" ping posted when the last channel is destroyed while
    /// `connect_requested` is true does not imply a new connection attempt
    /// started — treat every `on_connecting` firing as "connection state
    /// changed," not strictly "now connecting."
    pub async fn on_readable_state(&self, handler: ReadableStateHandlerFn) {
        *self.events.on_readable_state.lock().await = Some(handler);
    }

    pub async fn on_writable_state(&self, handler: WritableStateHandlerFn) {
        *self.events.on_writable_state.lock().await = Some(handler);
    }

    pub async fn on_request_signaling(&self, handler: RequestSignalingHandlerFn) {
        *self.events.on_request_signaling.lock().await = Some(handler);
    }

    pub async fn on_candidates_ready(&self, handler: CandidatesReadyHandlerFn) {
        *self.events.on_candidates_ready.lock().await = Some(handler);
    }

    /// Drives the signaling-thread message pump: dispatches worker-posted
    /// messages to the registered signal handlers. Spawned automatically by
    /// `Transport::new`, paired with `run_worker_loop`, the way
    /// `PeerConnectionDriver` is spawned to drive its own receivers.
    async fn run_signaling_loop(self: Arc<Self>) {
        let mut rx = {
            let mut slot = self.signaling_rx.lock().await;
            slot.take()
                .expect("run_signaling_loop must only be driven once per transport")
        };

        while let Some(msg) = rx.recv().await {
            match msg {
                SignalingMessage::Connecting => self.events.fire_connecting().await,
                SignalingMessage::ReadState => self.on_channel_readable_state_s().await,
                SignalingMessage::WriteState => self.on_channel_writable_state_s().await,
                SignalingMessage::RequestSignaling => self.events.fire_request_signaling().await,
                SignalingMessage::CandidatesReady => self.on_channel_candidate_ready_s().await,
            }
        }
    }

    async fn on_channel_readable_state_s(&self) {
        self.read_state_pending.store(false, Ordering::SeqCst);
        let readable = events::recompute_rollup(&self.channels, true);
        if self.readable.swap(readable, Ordering::SeqCst) != readable {
            self.events.fire_readable_state(readable).await;
        }
    }

    async fn on_channel_writable_state_s(&self) {
        self.write_state_pending.store(false, Ordering::SeqCst);
        let writable = events::recompute_rollup(&self.channels, false);
        if self.writable.swap(writable, Ordering::SeqCst) != writable {
            self.events.fire_writable_state(writable).await;
        }
    }

    /// Posts a READSTATE/WRITESTATE ping unless one is already queued for the
    /// signaling thread — collapses a burst of state flips into a single
    /// rollup recomputation (spec.md §4.4 Rationale).
    fn post_read_state(&self, signaling_tx: &mpsc::UnboundedSender<SignalingMessage>) {
        if !self.read_state_pending.swap(true, Ordering::SeqCst) {
            let _ = signaling_tx.send(SignalingMessage::ReadState);
        }
    }

    fn post_write_state(&self, signaling_tx: &mpsc::UnboundedSender<SignalingMessage>) {
        if !self.write_state_pending.swap(true, Ordering::SeqCst) {
            let _ = signaling_tx.send(SignalingMessage::WriteState);
        }
    }

    async fn on_channel_candidate_ready_s(&self) {
        let candidates = self.ready_candidates.swap_out();
        if !candidates.is_empty() {
            self.events.fire_candidates_ready(candidates).await;
        }
    }

    // ---- public mutating operations (signaling thread) ----------------

    /// Synchronously marshals to the worker; returns the newly created
    /// channel handle.
    pub async fn create_channel(
        &self,
        name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Arc<dyn TransportChannel> {
        let (reply, reply_rx) = oneshot::channel();
        let _ = self.worker_tx.send(WorkerMessage::CreateChannel {
            name: name.into(),
            content_type: content_type.into(),
            reply,
        });
        reply_rx.await.expect("transport worker task is gone")
    }

    pub fn get_channel(&self, name: &str) -> Option<Arc<dyn TransportChannel>> {
        self.channels.lookup(name)
    }

    pub fn has_channels(&self) -> bool {
        !self.channels.is_empty()
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains(name)
    }

    pub async fn destroy_channel(&self, name: impl Into<String>) {
        let (reply, reply_rx) = oneshot::channel();
        let _ = self
            .worker_tx
            .send(WorkerMessage::DestroyChannel { name: name.into(), reply });
        let _ = reply_rx.await;
    }

    pub async fn destroy_all_channels(&self) {
        let (reply, reply_rx) = oneshot::channel();
        let _ = self
            .worker_tx
            .send(WorkerMessage::DestroyAllChannels { reply });
        let _ = reply_rx.await;
        self.destroyed.store(true, Ordering::SeqCst);
    }

    pub async fn connect_channels(&self) {
        let (reply, reply_rx) = oneshot::channel();
        let _ = self.worker_tx.send(WorkerMessage::ConnectChannels { reply });
        let _ = reply_rx.await;
    }

    pub async fn reset_channels(&self) {
        let (reply, reply_rx) = oneshot::channel();
        let _ = self.worker_tx.send(WorkerMessage::ResetChannels { reply });
        let _ = reply_rx.await;
    }

    pub fn on_signaling_ready(&self) {
        let _ = self.worker_tx.send(WorkerMessage::OnSignalingReady);
        self.subclass.on_transport_signaling_ready();
    }

    pub fn on_remote_candidates(&self, candidates: Vec<Candidate>) {
        for candidate in candidates {
            self.on_remote_candidate(candidate);
        }
    }

    /// Precondition: `has_channel(candidate.channel_name)`. Clones the
    /// candidate into a heap-owned envelope and posts it to the worker; the
    /// worker drops it silently if the channel is gone by the time the
    /// message is dispatched (spec.md §5, "documented race").
    pub fn on_remote_candidate(&self, candidate: Candidate) {
        debug_assert!(
            self.has_channel(&candidate.channel_name),
            "remote candidate for unknown channel '{}'",
            candidate.channel_name
        );
        let params = ChannelParams::for_candidate(candidate);
        let _ = self.worker_tx.send(WorkerMessage::OnRemoteCandidate(params));
    }

    // ---- worker-thread loop -------------------------------------------

    /// Single strictly-ordered worker queue: signaling-side commands and
    /// channel-originated events (`WorkerMessage::ChannelEvent`, fed by
    /// `ChannelEventSink`) share one `mpsc` receiver, so they are dispatched
    /// in exactly the order they were sent — matching the ordering the
    /// original's single worker OS thread provided for free. A second
    /// channel merged with `select!` would pick whichever was ready at
    /// random and could reorder a candidate-ready burst relative to a
    /// `connect_channels()` call racing it (spec.md §8 scenario 3).
    async fn run_worker_loop(
        self: Arc<Self>,
        mut worker_rx: mpsc::UnboundedReceiver<WorkerMessage>,
        signaling_tx: mpsc::UnboundedSender<SignalingMessage>,
    ) {
        while let Some(msg) = worker_rx.recv().await {
            self.handle_worker_message(msg, &signaling_tx).await;
        }
    }

    async fn handle_worker_message(
        &self,
        msg: WorkerMessage,
        signaling_tx: &mpsc::UnboundedSender<SignalingMessage>,
    ) {
        match msg {
            WorkerMessage::CreateChannel { name, content_type, reply } => {
                let channel = self.create_channel_w(name, content_type, signaling_tx).await;
                let _ = reply.send(channel);
            }
            WorkerMessage::DestroyChannel { name, reply } => {
                self.destroy_channel_w(&name, signaling_tx).await;
                let _ = reply.send(());
            }
            WorkerMessage::DestroyAllChannels { reply } => {
                self.destroy_all_channels_w().await;
                let _ = reply.send(());
            }
            WorkerMessage::ConnectChannels { reply } => {
                self.connect_channels_w(signaling_tx).await;
                let _ = reply.send(());
            }
            WorkerMessage::ResetChannels { reply } => {
                self.reset_channels_w().await;
                let _ = reply.send(());
            }
            WorkerMessage::OnSignalingReady => {
                self.call_channels_on_signaling_ready_w().await;
            }
            WorkerMessage::OnRemoteCandidate(params) => {
                self.on_remote_candidate_w(params).await;
            }
            WorkerMessage::ChannelEvent(name, event) => {
                self.handle_channel_event(name, event, signaling_tx).await;
            }
        }
    }

    async fn create_channel_w(
        &self,
        name: String,
        content_type: String,
        signaling_tx: &mpsc::UnboundedSender<SignalingMessage>,
    ) -> Arc<dyn TransportChannel> {
        let sink = ChannelEventSink::new(name.clone(), self.worker_tx.clone());
        let channel = self
            .subclass
            .create_transport_channel(&name, &content_type, sink)
            .await;

        let inserted = self.channels.insert(name.clone(), channel.clone());
        debug_assert!(inserted, "duplicate channel name '{name}'");
        if !inserted {
            log::error!("channel '{name}' already exists; ignoring duplicate create_channel");
        }
        self.destroyed.store(false, Ordering::SeqCst);

        if self.connect_requested.load(Ordering::SeqCst) {
            channel.connect().await;
            if self.channels.size() == 1 {
                let _ = signaling_tx.send(SignalingMessage::Connecting);
            }
        }

        channel
    }

    async fn destroy_channel_w(
        &self,
        name: &str,
        signaling_tx: &mpsc::UnboundedSender<SignalingMessage>,
    ) {
        let channel = self.channels.remove(name);
        debug_assert!(channel.is_some(), "destroy of unknown channel '{name}'");

        if self.connect_requested.load(Ordering::SeqCst) && self.channels.is_empty() {
            let _ = signaling_tx.send(SignalingMessage::Connecting);
        }

        if let Some(channel) = channel {
            // Re-evaluate the writable rollup as if the channel were
            // already gone — it is, the registry no longer holds it.
            self.post_write_state(signaling_tx);
            self.subclass.destroy_transport_channel(channel).await;
        }
    }

    async fn destroy_all_channels_w(&self) {
        for channel in self.channels.drain() {
            self.subclass.destroy_transport_channel(channel).await;
        }
    }

    async fn connect_channels_w(&self, signaling_tx: &mpsc::UnboundedSender<SignalingMessage>) {
        if self.connect_requested.swap(true, Ordering::SeqCst) {
            return;
        }

        let _ = signaling_tx.send(SignalingMessage::CandidatesReady);

        let snapshot = self.channels.snapshot();
        for (_, channel) in &snapshot {
            channel.connect().await;
        }
        if !snapshot.is_empty() {
            let _ = signaling_tx.send(SignalingMessage::Connecting);
        }
    }

    async fn reset_channels_w(&self) {
        self.connect_requested.store(false, Ordering::SeqCst);
        self.ready_candidates.clear();

        for (_, channel) in self.channels.snapshot() {
            channel.reset().await;
        }
    }

    async fn call_channels_on_signaling_ready_w(&self) {
        for (_, channel) in self.channels.snapshot() {
            channel.on_signaling_ready().await;
        }
    }

    async fn on_remote_candidate_w(&self, params: ChannelParams) {
        let Some(candidate) = params.candidate else {
            return;
        };
        if let Some(channel) = self.channels.lookup(&params.name) {
            channel.on_candidate(&candidate).await;
        } else {
            log::debug!(
                "dropping remote candidate for destroyed channel '{}'",
                params.name
            );
        }
    }

    async fn handle_channel_event(
        &self,
        _name: String,
        event: ChannelEvent,
        signaling_tx: &mpsc::UnboundedSender<SignalingMessage>,
    ) {
        match event {
            ChannelEvent::ReadableStateChanged => {
                self.post_read_state(signaling_tx);
            }
            ChannelEvent::WritableStateChanged => {
                self.post_write_state(signaling_tx);
            }
            ChannelEvent::RequestSignaling => {
                let _ = signaling_tx.send(SignalingMessage::RequestSignaling);
            }
            ChannelEvent::CandidateReady(candidate) => {
                self.ready_candidates.push(candidate);
                if self.connect_requested.load(Ordering::SeqCst) {
                    let _ = signaling_tx.send(SignalingMessage::CandidatesReady);
                }
            }
        }
    }
}
