//! Media Variety Tracking
//!
//! A round-robin scheduler over media kinds that never hands out the same kind
//! twice in a row. One tracker belongs to one session; it is mutated only through
//! [`MediaVarietyTracker::next_kind`] and needs external synchronisation if it is
//! ever shared.

use crate::media::MediaKind;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use std::collections::VecDeque;

pub struct MediaVarietyTracker<R = StdRng> {
    kinds: Vec<MediaKind>,
    queue: VecDeque<MediaKind>,
    last: Option<MediaKind>,
    rng: R,
}

impl MediaVarietyTracker<StdRng> {
    /// Creates a tracker over `kinds` seeded from the operating system.
    pub fn new(kinds: Vec<MediaKind>) -> Self {
        Self::with_rng(kinds, StdRng::from_os_rng())
    }
}

impl Default for MediaVarietyTracker<StdRng> {
    fn default() -> Self {
        Self::new(MediaKind::ALL.to_vec())
    }
}

impl<R: Rng> MediaVarietyTracker<R> {
    /// Creates a tracker with an explicit random source.
    ///
    /// Duplicate kinds are collapsed; an empty list means every kind. The first
    /// pass follows the given order, later passes are shuffled.
    pub fn with_rng(kinds: Vec<MediaKind>, rng: R) -> Self {
        let mut unique: Vec<MediaKind> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        if unique.is_empty() {
            unique = MediaKind::ALL.to_vec();
        }
        Self {
            queue: unique.iter().copied().collect(),
            kinds: unique,
            last: None,
            rng,
        }
    }

    /// Returns the next media kind, never equal to the previous one when more
    /// than one kind is configured.
    pub fn next_kind(&mut self) -> MediaKind {
        if self.queue.is_empty() {
            self.refill();
        }
        let mut kind = self.queue.pop_front().unwrap_or(self.kinds[0]);

        let mut attempts = 0;
        while Some(kind) == self.last && self.kinds.len() > 1 && attempts < self.kinds.len() {
            if self.queue.is_empty() {
                self.refill();
            }
            self.queue.push_back(kind);
            kind = self.queue.pop_front().unwrap_or(kind);
            attempts += 1;
        }

        self.last = Some(kind);
        kind
    }

    /// The most recently returned kind, `None` before the first draw.
    pub fn last_kind(&self) -> Option<MediaKind> {
        self.last
    }

    pub fn kinds(&self) -> &[MediaKind] {
        &self.kinds
    }

    fn refill(&mut self) {
        let mut shuffled = self.kinds.clone();
        shuffled.shuffle(&mut self.rng);
        self.queue = shuffled.into();
    }
}
