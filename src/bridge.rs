//! ThreadBridge (C2): the message-id protocol between the signaling and
//! worker sides (spec.md §4.6 "Message-id protocol"). Realized as tagged
//! variants instead of an integer `MSG_*` switch, per design note §9.

use tokio::sync::oneshot;

use crate::candidate::ChannelParams;
use crate::channel::{ChannelEvent, TransportChannel};
use std::sync::Arc;

/// Messages sent from the signaling side to the worker, plus channel-
/// originated events fed in from `ChannelEventSink`. `CREATECHANNEL` through
/// `RESETCHANNELS` are "send" (blocking — the caller awaits `reply`);
/// `ONSIGNALINGREADY`, `ONREMOTECANDIDATE`, and `CHANNELEVENT` are "post"
/// (fire-and-forget, no reply channel). All variants share a single queue so
/// that channel events interleave with signaling-side commands in the exact
/// order they were sent — the original's single worker OS thread provided
/// this ordering for free; a second channel merged with `select!` would not.
pub enum WorkerMessage {
    CreateChannel {
        name: String,
        content_type: String,
        reply: oneshot::Sender<Arc<dyn TransportChannel>>,
    },
    DestroyChannel {
        name: String,
        reply: oneshot::Sender<()>,
    },
    DestroyAllChannels {
        reply: oneshot::Sender<()>,
    },
    ConnectChannels {
        reply: oneshot::Sender<()>,
    },
    ResetChannels {
        reply: oneshot::Sender<()>,
    },
    OnSignalingReady,
    OnRemoteCandidate(ChannelParams),
    ChannelEvent(String, ChannelEvent),
}

/// Messages posted from the worker to the signaling side. All are `post` —
/// none of them carry a reply channel. `ReadState`/`WriteState` are
/// deduplicated by `Transport`'s pending-flag pair before being sent, so a
/// burst of channel state flips collapses to a single recomputation.
pub enum SignalingMessage {
    Connecting,
    ReadState,
    WriteState,
    RequestSignaling,
    CandidatesReady,
}
