//! ChannelRegistry (C3): mutex-guarded mapping from channel-name to channel
//! implementation. All operations are synchronized on an internal mutex
//! (spec.md §4.2); the mutex is never held across a call into a channel
//! implementation (spec.md Invariant 2).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::channel::TransportChannel;

pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, Arc<dyn TransportChannel>>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        ChannelRegistry {
            channels: Mutex::new(HashMap::new()),
        }
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails (returns `false`) if `name` is already present.
    pub fn insert(&self, name: String, channel: Arc<dyn TransportChannel>) -> bool {
        let mut channels = self.channels.lock().unwrap();
        if channels.contains_key(&name) {
            return false;
        }
        channels.insert(name, channel);
        true
    }

    pub fn remove(&self, name: &str) -> Option<Arc<dyn TransportChannel>> {
        self.channels.lock().unwrap().remove(name)
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn TransportChannel>> {
        self.channels.lock().unwrap().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.lock().unwrap().contains_key(name)
    }

    pub fn snapshot(&self) -> Vec<(String, Arc<dyn TransportChannel>)> {
        self.channels
            .lock()
            .unwrap()
            .iter()
            .map(|(name, ch)| (name.clone(), ch.clone()))
            .collect()
    }

    /// Empties the registry and returns every channel it held, in
    /// unspecified order.
    pub fn drain(&self) -> Vec<Arc<dyn TransportChannel>> {
        self.channels
            .lock()
            .unwrap()
            .drain()
            .map(|(_, ch)| ch)
            .collect()
    }

    pub fn size(&self) -> usize {
        self.channels.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}
