//! Slot ownership for concurrent workers.
//!
//! Each slot has one availability flag. A worker owns a slot from a
//! successful `true -> false` CAS until the matching `false -> true` CAS.
//! A release that finds the flag already `true` means two owners existed,
//! which is fatal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::K_RING_CAPACITY;
use crate::error::{RenderError, RenderResult};
use crate::fatal;

pub struct SlotRing {
    available: [AtomicBool; K_RING_CAPACITY],
}

impl Default for SlotRing {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotRing {
    pub fn new() -> Self {
        Self {
            available: std::array::from_fn(|_| AtomicBool::new(true)),
        }
    }

    /// Claims a free slot among the first `ring_size`, scanning forward from
    /// `preferred` with wraparound.
    ///
    /// Gives up after [`K_RING_CAPACITY`] full rounds, yielding between
    /// rounds. With at most `ring_size / 2` workers a free slot always exists,
    /// so running out of rounds is reported as starvation.
    pub fn claim(&self, preferred: usize, ring_size: usize) -> RenderResult<SlotClaim<'_>> {
        let ring_size = ring_size.clamp(1, K_RING_CAPACITY);
        let start = preferred % ring_size;

        for round in 0..K_RING_CAPACITY {
            for offset in 0..ring_size {
                let index = (start + offset) % ring_size;
                if let Some(claim) = self.try_claim(index) {
                    return Ok(claim);
                }
            }
            tracing::trace!(round, ring_size, "no free slot, yielding");
            thread::yield_now();
        }

        Err(RenderError::Starvation {
            rounds: K_RING_CAPACITY,
            ring_size,
        })
    }

    pub fn try_claim(&self, index: usize) -> Option<SlotClaim<'_>> {
        self.available[index]
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Relaxed)
            .ok()
            .map(|_| SlotClaim { ring: self, index })
    }

    /// Marks `index` free again. Fails if it was not claimed.
    pub fn release(&self, index: usize) -> RenderResult<()> {
        self.available[index]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Relaxed)
            .map(|_| ())
            .map_err(|_| RenderError::SlotConflict { slot: index })
    }

    pub fn is_available(&self, index: usize) -> bool {
        self.available[index].load(Ordering::Acquire)
    }

    pub fn all_available(&self) -> bool {
        (0..K_RING_CAPACITY).all(|i| self.is_available(i))
    }
}

/// Exclusive ownership of one slot. Releases on drop.
#[must_use = "dropping the claim releases the slot immediately"]
pub struct SlotClaim<'a> {
    ring: &'a SlotRing,
    index: usize,
}

impl SlotClaim<'_> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for SlotClaim<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.ring.release(self.index) {
            fatal::abort(Some(self.index), &e.to_string());
        }
    }
}

impl std::fmt::Debug for SlotClaim<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotClaim").field("index", &self.index).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_claim_prefers_requested_slot() {
        let ring = SlotRing::new();
        let claim = ring.claim(2, 4).unwrap();
        assert_eq!(claim.index(), 2);
        assert!(!ring.is_available(2));
    }

    #[test]
    fn test_claim_scans_forward_and_wraps() {
        let ring = SlotRing::new();
        let a = ring.claim(2, 3).unwrap();
        let b = ring.claim(2, 3).unwrap();
        let c = ring.claim(2, 3).unwrap();
        assert_eq!((a.index(), b.index(), c.index()), (2, 0, 1));
    }

    #[test]
    fn test_drop_releases() {
        let ring = SlotRing::new();
        {
            let _claim = ring.claim(0, 2).unwrap();
            assert!(!ring.is_available(0));
        }
        assert!(ring.all_available());
    }

    #[test]
    fn test_release_of_free_slot_is_conflict() {
        let ring = SlotRing::new();
        assert!(matches!(
            ring.release(1),
            Err(RenderError::SlotConflict { slot: 1 })
        ));
    }

    #[test]
    fn test_full_ring_starves() {
        let ring = SlotRing::new();
        let _a = ring.claim(0, 2).unwrap();
        let _b = ring.claim(0, 2).unwrap();
        assert!(matches!(
            ring.claim(0, 2),
            Err(RenderError::Starvation { ring_size: 2, .. })
        ));
    }

    #[test]
    fn test_ring_size_is_clamped() {
        let ring = SlotRing::new();
        let claim = ring.claim(K_RING_CAPACITY + 3, 64).unwrap();
        assert_eq!(claim.index(), 3);
    }

    #[test]
    fn test_concurrent_claims_never_overlap() {
        const WORKERS: usize = 3;
        const SLOTS: usize = 6;
        const ITERATIONS: usize = 2_000;

        let ring = Arc::new(SlotRing::new());
        let occupancy: Arc<Vec<AtomicUsize>> =
            Arc::new((0..SLOTS).map(|_| AtomicUsize::new(0)).collect());

        let handles: Vec<_> = (0..WORKERS)
            .map(|worker| {
                let ring = ring.clone();
                let occupancy = occupancy.clone();
                thread::spawn(move || {
                    let mut preferred = worker * 2;
                    for _ in 0..ITERATIONS {
                        let claim = ring.claim(preferred, SLOTS).unwrap();
                        let i = claim.index();
                        assert_eq!(occupancy[i].fetch_add(1, Ordering::SeqCst), 0);
                        thread::yield_now();
                        assert_eq!(occupancy[i].fetch_sub(1, Ordering::SeqCst), 1);
                        preferred = i + 1;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(ring.all_available());
    }
}
