//! Route Origin Validation of the routes of a snapshot against its VRPs.
//!
//! For every VRP the engine looks up the routes whose bit string starts
//! with the VRP's network bits, classifies each of them against the VRP and
//! writes the verdict back. A route covered by several VRPs gets a verdict
//! from each of them; the store merges them so that a `Valid` verdict is
//! never lost to a later mismatch (see [Validity::supersede]), while
//! mismatches overwrite each other in the order they arrive.

use log::{debug, info, trace};

use crate::coordinator::Coordinator;
use crate::errors::StoreError;
use crate::stats::{ValidationCounters, ValidationReport, ValidityTally};
use crate::store::RecordStore;
use crate::types::{Route, RouteFilter, RouteUpdate, Stored, Validity, Vrp};

/// The verdict of a single VRP for a route it covers.
///
/// The route must be covered by the VRP, that is the VRP's bit string is
/// a prefix of the route's and the route is at least as long as the VRP
/// prefix. The result is never `Unknown`.
pub fn classify(route: &Route, vrp: &Vrp) -> Validity {
    let roa_len = vrp.binary.len();
    let roa_max = vrp.max_length as usize;
    let route_len = route.prefix_len() as usize;

    match (route.asn == vrp.asn, route_len <= roa_max) {
        (true, true) => Validity::Valid,
        (true, false) if roa_len == roa_max => Validity::FixedLengthExceeded,
        (true, false) => Validity::RangeLengthExceeded,
        (false, true) => Validity::AsnMismatch,
        (false, false) => Validity::AsnAndLengthMismatch,
    }
}

/// Whether the VRP says anything about the route at all. Routes less
/// specific than the VRP are not covered, even though the bit string of
/// their full address may start with the VRP's bits.
pub fn covers(vrp: &Vrp, route: &Route) -> bool {
    vrp.binary.is_prefix_of(&route.binary)
        && route.prefix_len() as usize >= vrp.binary.len()
}

/// Validate the candidate routes of a single VRP. Returns the number of
/// candidates the prefix search found and the number of routes updated.
pub fn validate_vrp(
    store: &dyn RecordStore,
    collection: &str,
    vrp: &Stored<Vrp>,
) -> Result<(usize, usize), StoreError> {
    let candidates = store.find_routes(
        collection,
        &RouteFilter::BinaryPrefix(vrp.value.binary.clone()),
    )?;

    let mut updated = 0;
    for route in candidates.iter().filter(|r| covers(&vrp.value, &r.value)) {
        let verdict = classify(&route.value, &vrp.value);
        trace!("{} by {} ({}): {}", route.value, vrp.value, vrp.id, verdict);
        store.update_route(
            collection,
            route.id,
            &RouteUpdate::Validation {
                verdict,
                vrp: vrp.id,
            },
        )?;
        updated += 1;
    }
    Ok((candidates.len(), updated))
}

/// Validate all routes in `routes` against all VRPs in `vrps`.
///
/// With `reset_match_trail`, the validity and the match trail of every
/// route are reset first, so that running a pass twice over the same
/// snapshot gives the same result. Without it, verdicts and trails
/// accumulate over passes.
pub fn validate(
    store: &dyn RecordStore,
    coordinator: &Coordinator,
    routes: &str,
    vrps: &str,
    reset_match_trail: bool,
) -> Result<ValidationReport, StoreError> {
    if reset_match_trail {
        let n = store.update_routes(
            routes,
            &RouteFilter::All,
            &RouteUpdate::ResetValidation,
        )?;
        debug!("reset validity of {} routes in {}", n, routes);
    }

    let counters = ValidationCounters::default();
    let vrp_list = store.vrps(vrps)?;

    coordinator.fan_out("validate", vrp_list, |vrp| {
        let (candidates, updated) = validate_vrp(store, routes, &vrp)?;
        counters.vrps.inc();
        counters.candidates.add(candidates);
        counters.updates.add(updated);
        Ok::<_, StoreError>(())
    })?;

    let tally: ValidityTally = store
        .routes(routes)?
        .into_iter()
        .map(|r| r.value.validity)
        .collect();
    let report = counters.report(tally);
    info!(
        "validated {} routes against {} vrps, {} valid",
        report.tally.total(),
        report.vrps,
        report.tally.get(Validity::Valid)
    );
    Ok(report)
}
