//! A complete daily update: load, validate, annotate.
//!
//! The stages run strictly one after the other, in this order:
//!
//! 1. load the VRPs into `{date}-vrp`, replacing what was there;
//! 2. load the IPv4 routes into `{date}-routes`;
//! 3. load the IPv6 routes into `{date}-routes`;
//! 4. validate the routes against the VRPs;
//! 5. annotate the IPv4 routes with their registry;
//! 6. annotate the IPv6 routes with their registry.
//!
//! Every stage fans its work items out over the same [Coordinator]. Any
//! fetch or store error aborts the run at the stage it happened in; the
//! store is then left with whatever the earlier stages wrote.

use std::fmt;
use std::sync::Arc;

use log::info;

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::errors::RunError;
use crate::fetch::FeedSource;
use crate::stats::{AnnotationReport, IngestReport, ValidationReport};
use crate::store::{RecordStore, SnapshotDate};
use crate::types::AddressFamily;
use crate::{ingest, registry, validate};

pub struct Pipeline {
    store: Arc<dyn RecordStore>,
    feeds: Arc<dyn FeedSource>,
    coordinator: Coordinator,
    config: Config,
    date: SnapshotDate,
    reset_match_trail: bool,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        feeds: Arc<dyn FeedSource>,
        config: Config,
        date: SnapshotDate,
    ) -> Result<Self, RunError> {
        let coordinator = Coordinator::new(config.max_in_flight)?;
        Ok(Self {
            store,
            feeds,
            coordinator,
            config,
            date,
            reset_match_trail: true,
        })
    }

    /// Keep validity and match trail of routes already in the snapshot
    /// when validating, instead of resetting them first.
    ///
    /// Only of use with a store that holds an earlier run of the same date.
    pub fn keep_match_trail(mut self) -> Self {
        self.reset_match_trail = false;
        self
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn date(&self) -> SnapshotDate {
        self.date
    }

    pub fn run(&self) -> Result<RunReport, RunError> {
        let store = &*self.store;
        let feeds = &self.config.feeds;
        let routes = self.date.routes_collection();
        let vrps = self.date.vrp_collection();
        info!("starting update of snapshot {}", self.date);

        let lines = self.feeds.fetch_lines(&feeds.vrps)?;
        let vrp_report =
            ingest::load_vrps(store, &self.coordinator, &vrps, &lines)?;

        let mut route_report = IngestReport::default();
        for url in [&feeds.ris_v4, &feeds.ris_v6] {
            let lines = self.feeds.fetch_lines(url)?;
            route_report += ingest::load_routes(
                store,
                &self.coordinator,
                &routes,
                &lines,
                self.config.min_peers,
            )?;
        }

        let validation = validate::validate(
            store,
            &self.coordinator,
            &routes,
            &vrps,
            self.reset_match_trail,
        )?;

        let mut rirs = [AnnotationReport::default(); 2];
        for (report, (url, family)) in rirs.iter_mut().zip([
            (&feeds.rirs_v4, AddressFamily::Ipv4),
            (&feeds.rirs_v6, AddressFamily::Ipv6),
        ]) {
            let rows = self.feeds.fetch_table(url)?;
            *report = registry::annotate(
                store,
                &self.coordinator,
                &routes,
                &rows,
                family,
                self.config.ipv4_rir_matching,
            )?;
        }
        let [rirs_v4, rirs_v6] = rirs;

        info!("finished update of snapshot {}", self.date);
        Ok(RunReport {
            date: self.date,
            vrps: vrp_report,
            routes: route_report,
            validation,
            rirs_v4,
            rirs_v6,
            peak_in_flight: self.coordinator.peak_in_flight(),
        })
    }
}

//------------ RunReport -----------------------------------------------------

#[derive(Clone, Debug)]
pub struct RunReport {
    pub date: SnapshotDate,
    pub vrps: IngestReport,
    /// Both route dumps together.
    pub routes: IngestReport,
    pub validation: ValidationReport,
    pub rirs_v4: AnnotationReport,
    pub rirs_v6: AnnotationReport,
    pub peak_in_flight: usize,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "snapshot {}", self.date)?;
        writeln!(f, "--- vrps")?;
        write!(f, "{}", self.vrps)?;
        writeln!(f, "--- routes")?;
        write!(f, "{}", self.routes)?;
        writeln!(f, "--- validation")?;
        write!(f, "{}", self.validation)?;
        writeln!(f, "--- rirs ipv4")?;
        write!(f, "{}", self.rirs_v4)?;
        writeln!(f, "--- rirs ipv6")?;
        write!(f, "{}", self.rirs_v6)?;
        writeln!(f, "peak in flight:\t\t{}", self.peak_in_flight)
    }
}
