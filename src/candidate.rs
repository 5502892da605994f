use std::net::SocketAddr;

/// An immutable record describing a reachable network endpoint for one
/// channel. `extra` carries opaque trailing fields transparently through to
/// the channel implementation (foundation, priority, type, ...) without this
/// core needing to understand them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub channel_name: String,
    pub address: SocketAddr,
    pub extra: Vec<(String, String)>,
}

impl Candidate {
    pub fn new(channel_name: impl Into<String>, address: SocketAddr) -> Self {
        Candidate {
            channel_name: channel_name.into(),
            address,
            extra: Vec::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }
}

/// Typed payload for the `ONREMOTECANDIDATE` cross-thread message. Owning
/// this struct is the move-only envelope design note §9 calls for: whichever
/// side ends up holding it is responsible for it, and it is released exactly
/// once by ordinary `Drop` when that side is done with it.
#[derive(Debug)]
pub struct ChannelParams {
    pub name: String,
    pub candidate: Option<Box<Candidate>>,
}

impl ChannelParams {
    pub fn for_channel(name: impl Into<String>) -> Self {
        ChannelParams {
            name: name.into(),
            candidate: None,
        }
    }

    pub fn for_candidate(candidate: Candidate) -> Self {
        ChannelParams {
            name: candidate.channel_name.clone(),
            candidate: Some(Box::new(candidate)),
        }
    }
}
