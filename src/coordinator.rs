//------------ Coordinator ---------------------------------------------------

//! Bounded fan-out of the work items of a stage.
//!
//! Every stage of a run (loading a feed, validating, annotating) turns its
//! input into independent work items: one line, one VRP, one delegation row.
//! The [Coordinator] runs the items of a stage on a fixed number of worker
//! threads, so that no more than `capacity` items hit the record store at the
//! same time, and returns only when all of them are done.
//!
//! ```
//! use rotonda_rov::coordinator::Coordinator;
//!
//! let coordinator = Coordinator::new(4)?;
//! let done = coordinator.fan_out("count", 0..100_u32, |_| {
//!     Ok::<_, std::convert::Infallible>(())
//! })?;
//! assert_eq!(done, 100);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use log::{debug, trace};
use rayon::prelude::*;

use crate::errors::CoordinatorError;

/// The number of work items in flight at any one time, if not configured
/// otherwise.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 20;

/// A fixed-capacity admission gate for the work items of all stages.
///
/// Each worker thread of the pool is one slot: an item is admitted when a
/// worker picks it up, and its slot is released when the work function
/// returns, whether it succeeded or failed. The first item that fails stops
/// the admission of the remaining items of the stage, and its error is
/// returned from [fan_out](Coordinator::fan_out).
pub struct Coordinator {
    pool: rayon::ThreadPool,
    capacity: usize,
    in_flight: CachePadded<AtomicUsize>,
    peak: CachePadded<AtomicUsize>,
}

impl Coordinator {
    pub fn new(capacity: usize) -> Result<Self, CoordinatorError> {
        if capacity == 0 {
            return Err(CoordinatorError::ZeroCapacity);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(capacity)
            .thread_name(|i| format!("rov-worker-{}", i))
            .build()
            .map_err(CoordinatorError::ThreadPool)?;

        Ok(Self {
            pool,
            capacity,
            in_flight: CachePadded::new(AtomicUsize::new(0)),
            peak: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of work items running right now.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The highest number of work items that ran at the same time, over the
    /// lifetime of this coordinator.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }

    /// Run `work` for every item, at most `capacity` at a time, in no
    /// particular order. Blocks until all items are done, or until the
    /// first error. Returns the number of items that completed.
    pub fn fan_out<I, F, E>(
        &self,
        stage: &str,
        items: I,
        work: F,
    ) -> Result<usize, E>
    where
        I: IntoParallelIterator + Send,
        F: Fn(I::Item) -> Result<(), E> + Sync + Send,
        E: Send,
    {
        debug!("{}: start, capacity {}", stage, self.capacity);
        let done = AtomicUsize::new(0);

        let res = self.pool.install(|| {
            items.into_par_iter().try_for_each(|item| {
                let _slot = self.admit();
                work(item)?;
                done.fetch_add(1, Ordering::Relaxed);
                Ok(())
            })
        });

        let done = done.into_inner();
        match &res {
            Ok(()) => debug!("{}: {} items done", stage, done),
            Err(_) => debug!("{}: aborted after {} items", stage, done),
        }
        res.map(|_| done)
    }

    fn admit(&self) -> Slot<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        trace!("admit work item, {} in flight", now);
        Slot {
            in_flight: &self.in_flight,
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("capacity", &self.capacity)
            .field("in_flight", &self.in_flight())
            .field("peak", &self.peak_in_flight())
            .finish()
    }
}

//------------ Slot ----------------------------------------------------------

// An admitted work item. Dropping the slot releases it, on every path out of
// the work function.
struct Slot<'a> {
    in_flight: &'a AtomicUsize,
}

impl Drop for Slot<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn zero_capacity() {
        assert!(matches!(
            Coordinator::new(0),
            Err(CoordinatorError::ZeroCapacity)
        ));
    }

    #[test]
    fn bounded_by_capacity() {
        let coordinator = Coordinator::new(3).unwrap();
        let done = coordinator
            .fan_out("sleepy", (0..30).collect::<Vec<u32>>(), |_| {
                std::thread::sleep(Duration::from_millis(2));
                Ok::<_, ()>(())
            })
            .unwrap();
        assert_eq!(done, 30);
        assert!(coordinator.peak_in_flight() <= 3);
        assert!(coordinator.peak_in_flight() >= 1);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[test]
    fn first_error_is_returned() {
        let coordinator = Coordinator::new(2).unwrap();
        let res = coordinator.fan_out("failing", 0..1000_u32, |i| {
            if i == 7 {
                Err(i)
            } else {
                Ok(())
            }
        });
        assert_eq!(res, Err(7));
        assert_eq!(coordinator.in_flight(), 0);
    }
}
