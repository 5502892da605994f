//! CandidateQueue (C4): mutex-guarded list of locally-gathered candidates
//! awaiting signaling delivery. Ordering is insertion order; producers are
//! the worker thread, the consumer is the signaling thread (spec.md §4.3).

use std::sync::Mutex;

use crate::candidate::Candidate;

#[derive(Default)]
pub struct CandidateQueue {
    candidates: Mutex<Vec<Candidate>>,
}

impl CandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, candidate: Candidate) {
        self.candidates.lock().unwrap().push(candidate);
    }

    /// Drains the queue and returns everything it held, in insertion order.
    pub fn swap_out(&self) -> Vec<Candidate> {
        let mut candidates = self.candidates.lock().unwrap();
        std::mem::take(&mut *candidates)
    }

    pub fn clear(&self) {
        self.candidates.lock().unwrap().clear();
    }
}
