//------------ Types for Statistics -----------------------------------------

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;

use super::validity::Validity;

//------------ Counter -------------------------------------------------------
//
// A counter that is bumped from all workers of a stage at once. Padded so
// that the counters of one stage don't share a cache line.

#[derive(Debug, Default)]
pub(crate) struct Counter(CachePadded<AtomicUsize>);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: usize) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

//------------ IngestCounters / IngestReport ---------------------------------

#[derive(Debug, Default)]
pub(crate) struct IngestCounters {
    pub lines: Counter,
    pub inserted: Counter,
    pub skipped: Counter,
    pub below_threshold: Counter,
    pub malformed: Counter,
}

impl IngestCounters {
    pub fn report(&self) -> IngestReport {
        IngestReport {
            lines: self.lines.get(),
            inserted: self.inserted.get(),
            skipped: self.skipped.get(),
            below_threshold: self.below_threshold.get(),
            malformed: self.malformed.get(),
        }
    }
}

/// The outcome of loading one feed into the store.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// All lines in the feed.
    pub lines: usize,
    /// Records written to the store.
    pub inserted: usize,
    /// Header, comment and empty lines.
    pub skipped: usize,
    /// Routes seen by too few peers.
    pub below_threshold: usize,
    /// Lines that could not be parsed.
    pub malformed: usize,
}

impl std::ops::AddAssign for IngestReport {
    fn add_assign(&mut self, rhs: Self) {
        self.lines += rhs.lines;
        self.inserted += rhs.inserted;
        self.skipped += rhs.skipped;
        self.below_threshold += rhs.below_threshold;
        self.malformed += rhs.malformed;
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "lines:\t\t\t{}", self.lines)?;
        writeln!(f, "inserted:\t\t{}", self.inserted)?;
        writeln!(f, "skipped:\t\t{}", self.skipped)?;
        writeln!(f, "below threshold:\t{}", self.below_threshold)?;
        writeln!(f, "malformed:\t\t{}", self.malformed)
    }
}

//------------ ValidationCounters / ValidationReport -------------------------

#[derive(Debug, Default)]
pub(crate) struct ValidationCounters {
    pub vrps: Counter,
    pub candidates: Counter,
    pub updates: Counter,
}

/// The outcome of a validation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// VRPs that were matched against the routes.
    pub vrps: usize,
    /// Routes returned by the prefix searches of all VRPs.
    pub candidates: usize,
    /// (route, VRP) pairs that were classified and written back.
    pub updates: usize,
    /// The number of routes per validity state after the pass.
    pub tally: ValidityTally,
}

impl ValidationCounters {
    pub fn report(&self, tally: ValidityTally) -> ValidationReport {
        ValidationReport {
            vrps: self.vrps.get(),
            candidates: self.candidates.get(),
            updates: self.updates.get(),
            tally,
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vrps:\t\t\t{}", self.vrps)?;
        writeln!(f, "candidates:\t\t{}", self.candidates)?;
        writeln!(f, "updates:\t\t{}", self.updates)?;
        write!(f, "{}", self.tally)
    }
}

//------------ ValidityTally -------------------------------------------------

/// Route counts per validity state, indexed like [Validity::ALL].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidityTally([usize; 6]);

impl ValidityTally {
    fn slot(validity: Validity) -> usize {
        match validity {
            Validity::Unknown => 0,
            Validity::Valid => 1,
            Validity::FixedLengthExceeded => 2,
            Validity::RangeLengthExceeded => 3,
            Validity::AsnMismatch => 4,
            Validity::AsnAndLengthMismatch => 5,
        }
    }

    pub fn add(&mut self, validity: Validity) {
        if let Some(c) = self.0.get_mut(Self::slot(validity)) {
            *c += 1;
        }
    }

    pub fn get(&self, validity: Validity) -> usize {
        self.0.get(Self::slot(validity)).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

impl FromIterator<Validity> for ValidityTally {
    fn from_iter<T: IntoIterator<Item = Validity>>(iter: T) -> Self {
        let mut tally = ValidityTally::default();
        iter.into_iter().for_each(|v| tally.add(v));
        tally
    }
}

impl fmt::Display for ValidityTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for v in Validity::ALL {
            writeln!(f, "{}:\t{}", v, self.get(v))?;
        }
        Ok(())
    }
}

//------------ AnnotationCounters / AnnotationReport -------------------------

#[derive(Debug, Default)]
pub(crate) struct AnnotationCounters {
    pub rows: Counter,
    pub delegations: Counter,
    pub skipped: Counter,
    pub updated: Counter,
}

impl AnnotationCounters {
    pub fn report(&self) -> AnnotationReport {
        AnnotationReport {
            rows: self.rows.get(),
            delegations: self.delegations.get(),
            skipped: self.skipped.get(),
            updated: self.updated.get(),
        }
    }
}

/// The outcome of annotating routes with the delegations of one registry
/// file.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    pub rows: usize,
    /// Rows that parsed into a delegation and were applied.
    pub delegations: usize,
    /// Rows that are not delegations to a registry (headers, reserved
    /// space, malformed rows).
    pub skipped: usize,
    /// Route updates; a route counts once per delegation that matched it.
    pub updated: usize,
}

impl fmt::Display for AnnotationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows:\t\t\t{}", self.rows)?;
        writeln!(f, "delegations:\t\t{}", self.delegations)?;
        writeln!(f, "skipped:\t\t{}", self.skipped)?;
        writeln!(f, "routes updated:\t\t{}", self.updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_per_state() {
        let tally: ValidityTally = [
            Validity::Valid,
            Validity::Valid,
            Validity::AsnMismatch,
            Validity::Unknown,
        ]
        .into_iter()
        .collect();
        assert_eq!(tally.get(Validity::Valid), 2);
        assert_eq!(tally.get(Validity::AsnMismatch), 1);
        assert_eq!(tally.get(Validity::RangeLengthExceeded), 0);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn ingest_reports_add_up() {
        let mut a = IngestReport {
            lines: 10,
            inserted: 6,
            skipped: 1,
            below_threshold: 2,
            malformed: 1,
        };
        let b = a;
        a += b;
        assert_eq!(a.lines, 20);
        assert_eq!(a.inserted, 12);
    }
}
