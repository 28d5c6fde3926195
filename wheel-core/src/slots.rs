//! Connection slot bookkeeping.
//!
//! Each slot is a single atomic word holding either a peer handle or the
//! [`EMPTY`] sentinel. Handles are 16-bit, so the sentinel can never collide
//! with a real handle. Claiming and releasing use compare-and-swap, which
//! keeps the table consistent even if connect/disconnect events and the
//! feedback task's reads come from different contexts.

use portable_atomic::{AtomicU32, Ordering};

use crate::transport::PeerHandle;

/// Default connection ceiling (one steering unit, one pedal unit).
pub const MAX_PEERS: usize = 2;

/// Slot word for "no peer".
const EMPTY: u32 = u32::MAX;

/// What to do with a connection that arrives while every slot is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverflowPolicy {
    /// Refuse the connection; the transport must drop the link.
    #[default]
    Reject,
    /// Keep the link but do not track it (no feedback, no slot accounting).
    AcceptUntracked,
}

/// Result of [`ConnectionSlots::connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectOutcome {
    /// Tracked in slot `index`.
    Tracked { index: usize },
    /// The handle already occupies slot `index`; nothing changed.
    Duplicate { index: usize },
    /// Every slot is occupied and the policy is [`OverflowPolicy::AcceptUntracked`].
    Untracked,
    /// Every slot is occupied and the policy is [`OverflowPolicy::Reject`].
    Rejected,
}

/// Fixed table of `N` peer slots.
#[derive(Debug)]
pub struct ConnectionSlots<const N: usize = MAX_PEERS> {
    slots: [AtomicU32; N],
    policy: OverflowPolicy,
}

impl<const N: usize> ConnectionSlots<N> {
    /// Create an all-free slot table.
    #[must_use]
    pub const fn new(policy: OverflowPolicy) -> Self {
        Self {
            slots: [const { AtomicU32::new(EMPTY) }; N],
            policy,
        }
    }

    #[inline]
    #[must_use]
    pub const fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Track a newly connected peer in the first free slot.
    ///
    /// Concurrent connects for the same handle leave it in exactly one slot:
    /// after a claim, the lowest slot holding the handle wins and any other
    /// claim is released and reported as [`ConnectOutcome::Duplicate`].
    pub fn connect(&self, peer: PeerHandle) -> ConnectOutcome {
        if let Some(index) = self.index_of(peer) {
            return ConnectOutcome::Duplicate { index };
        }

        let word = peer.raw() as u32;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot
                .compare_exchange(EMPTY, word, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return match self.index_of(peer) {
                    Some(first) if first < index => {
                        slot.store(EMPTY, Ordering::Release);
                        ConnectOutcome::Duplicate { index: first }
                    }
                    _ => ConnectOutcome::Tracked { index },
                };
            }
        }

        match self.policy {
            OverflowPolicy::Reject => ConnectOutcome::Rejected,
            OverflowPolicy::AcceptUntracked => ConnectOutcome::Untracked,
        }
    }

    /// Free the slot holding exactly `peer`.
    ///
    /// Returns the freed slot index, or `None` if no slot held the handle.
    pub fn disconnect(&self, peer: PeerHandle) -> Option<usize> {
        let word = peer.raw() as u32;
        self.slots.iter().position(|slot| {
            slot.compare_exchange(word, EMPTY, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        })
    }

    /// Slot index currently holding `peer`.
    #[must_use]
    pub fn index_of(&self, peer: PeerHandle) -> Option<usize> {
        let word = peer.raw() as u32;
        self.slots
            .iter()
            .position(|slot| slot.load(Ordering::Acquire) == word)
    }

    /// Handle held by slot `index`, if occupied.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<PeerHandle> {
        decode(self.slots.get(index)?.load(Ordering::Acquire))
    }

    /// Iterate the handles of every occupied slot.
    pub fn peers(&self) -> impl Iterator<Item = PeerHandle> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| decode(slot.load(Ordering::Acquire)))
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn occupied(&self) -> usize {
        self.peers().count()
    }

    /// `true` while at least one slot is free.
    #[must_use]
    pub fn has_free_slot(&self) -> bool {
        self.occupied() < N
    }

    /// The connection ceiling `N`.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Free every slot.
    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(EMPTY, Ordering::Release);
        }
    }
}

impl<const N: usize> Default for ConnectionSlots<N> {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}

#[inline]
fn decode(word: u32) -> Option<PeerHandle> {
    if word == EMPTY {
        None
    } else {
        Some(PeerHandle(word as u16))
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;

    #[test]
    fn test_two_connects_fill_both_slots() {
        let slots = ConnectionSlots::<2>::new(OverflowPolicy::Reject);
        assert_eq!(slots.connect(PeerHandle(1)), ConnectOutcome::Tracked { index: 0 });
        assert!(slots.has_free_slot());
        assert_eq!(slots.connect(PeerHandle(2)), ConnectOutcome::Tracked { index: 1 });
        assert!(!slots.has_free_slot());
        assert_eq!(slots.occupied(), 2);
    }

    #[test]
    fn test_handle_zero_is_a_valid_handle() {
        let slots = ConnectionSlots::<2>::default();
        assert_eq!(slots.connect(PeerHandle(0)), ConnectOutcome::Tracked { index: 0 });
        assert_eq!(slots.get(0), Some(PeerHandle(0)));
        assert_eq!(slots.occupied(), 1);
        assert_eq!(slots.disconnect(PeerHandle(0)), Some(0));
        assert_eq!(slots.occupied(), 0);
    }

    #[test]
    fn test_overflow_rejected() {
        let slots = ConnectionSlots::<2>::new(OverflowPolicy::Reject);
        slots.connect(PeerHandle(1));
        slots.connect(PeerHandle(2));
        assert_eq!(slots.connect(PeerHandle(3)), ConnectOutcome::Rejected);
        assert_eq!(slots.index_of(PeerHandle(3)), None);
    }

    #[test]
    fn test_overflow_accepted_untracked() {
        let slots = ConnectionSlots::<2>::new(OverflowPolicy::AcceptUntracked);
        slots.connect(PeerHandle(1));
        slots.connect(PeerHandle(2));
        assert_eq!(slots.connect(PeerHandle(3)), ConnectOutcome::Untracked);
        assert_eq!(slots.occupied(), 2);
        assert_eq!(slots.disconnect(PeerHandle(3)), None);
        assert_eq!(slots.occupied(), 2);
    }

    #[test]
    fn test_disconnect_frees_matching_slot_only() {
        let slots = ConnectionSlots::<2>::default();
        slots.connect(PeerHandle(10));
        slots.connect(PeerHandle(20));

        // Second peer leaves: slot 1 must be freed, slot 0 kept.
        assert_eq!(slots.disconnect(PeerHandle(20)), Some(1));
        assert_eq!(slots.get(0), Some(PeerHandle(10)));
        assert_eq!(slots.get(1), None);
    }

    #[test]
    fn test_freed_slot_is_reused_first() {
        let slots = ConnectionSlots::<2>::default();
        slots.connect(PeerHandle(10));
        slots.connect(PeerHandle(20));
        slots.disconnect(PeerHandle(10));
        assert_eq!(slots.connect(PeerHandle(30)), ConnectOutcome::Tracked { index: 0 });
        let peers: Vec<_> = slots.peers().collect();
        assert_eq!(peers, [PeerHandle(30), PeerHandle(20)]);
    }

    #[test]
    fn test_duplicate_connect_not_tracked_twice() {
        let slots = ConnectionSlots::<2>::default();
        slots.connect(PeerHandle(7));
        assert_eq!(slots.connect(PeerHandle(7)), ConnectOutcome::Duplicate { index: 0 });
        assert_eq!(slots.occupied(), 1);
    }

    #[test]
    fn test_unknown_disconnect_frees_nothing() {
        let slots = ConnectionSlots::<2>::default();
        slots.connect(PeerHandle(1));
        assert_eq!(slots.disconnect(PeerHandle(99)), None);
        assert_eq!(slots.occupied(), 1);
    }

    #[test]
    fn test_concurrent_connects_of_same_handle_track_once() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        for _ in 0..500 {
            let slots = Arc::new(ConnectionSlots::<2>::default());
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let slots = Arc::clone(&slots);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        slots.connect(PeerHandle(42))
                    })
                })
                .collect();

            let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            let tracked = outcomes
                .iter()
                .filter(|o| matches!(o, ConnectOutcome::Tracked { .. }))
                .count();

            assert_eq!(tracked, 1, "outcomes: {:?}", outcomes);
            assert_eq!(slots.occupied(), 1);
            assert_eq!(slots.index_of(PeerHandle(42)), Some(0));
        }
    }

    #[test]
    fn test_policy_capacity_and_clear() {
        let slots = ConnectionSlots::<3>::new(OverflowPolicy::AcceptUntracked);
        assert_eq!(slots.policy(), OverflowPolicy::AcceptUntracked);
        assert_eq!(slots.capacity(), 3);
        assert_eq!(ConnectionSlots::<2>::default().policy(), OverflowPolicy::Reject);

        slots.connect(PeerHandle(1));
        slots.connect(PeerHandle(2));
        slots.clear();
        assert_eq!(slots.occupied(), 0);
        assert_eq!(slots.connect(PeerHandle(3)), ConnectOutcome::Tracked { index: 0 });
    }

    #[test]
    fn test_concurrent_connects_never_exceed_capacity() {
        use std::sync::Arc;
        use std::thread;

        let slots = Arc::new(ConnectionSlots::<2>::default());
        let handles: Vec<_> = (0..8u16)
            .map(|i| {
                let slots = Arc::clone(&slots);
                thread::spawn(move || slots.connect(PeerHandle(i)))
            })
            .collect();

        let tracked = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| matches!(o, ConnectOutcome::Tracked { .. }))
            .count();

        assert_eq!(tracked, 2);
        assert_eq!(slots.occupied(), 2);
    }
}
