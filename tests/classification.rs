use rotonda_rov::coordinator::Coordinator;
use rotonda_rov::store::{MemoryStore, RecordStore};
use rotonda_rov::test_types::{route, vrp};
use rotonda_rov::validate::{classify, validate};
use rotonda_rov::{RecordId, Validity};

mod common {
    use std::io::Write;

    pub fn init() {
        let _ = env_logger::builder()
            .format(|buf, record| writeln!(buf, "{}", record.args()))
            .is_test(true)
            .try_init();
    }
}

#[test]
fn test_classification_table() -> Result<(), Box<dyn std::error::Error>> {
    crate::common::init();

    let fixed = vrp(65001, "10.0.0.0/8", 8)?;
    let range = vrp(65001, "10.0.0.0/8", 16)?;

    for (r, v, expected) in [
        (route(65001, "10.0.0.0/8")?, &fixed, Validity::Valid),
        (
            route(65001, "10.0.0.0/24")?,
            &fixed,
            Validity::FixedLengthExceeded,
        ),
        (
            route(65001, "10.0.0.0/24")?,
            &range,
            Validity::RangeLengthExceeded,
        ),
        (route(65002, "10.0.0.0/16")?, &range, Validity::AsnMismatch),
        (
            route(65002, "10.0.0.0/24")?,
            &range,
            Validity::AsnAndLengthMismatch,
        ),
    ] {
        println!("{} against {}", r, v);
        assert_eq!(classify(&r, v), expected);
        assert_eq!(i8::from(expected), i8::from(classify(&r, v)));
    }

    Ok(())
}

#[test]
fn test_end_to_end_single_vrp() -> Result<(), Box<dyn std::error::Error>> {
    crate::common::init();

    let store = MemoryStore::new();
    let coordinator = Coordinator::new(4)?;

    let valid = store.insert_route("r", route(65001, "10.0.0.0/8")?)?;
    let too_long = store.insert_route("r", route(65001, "10.0.0.0/24")?)?;
    let other_asn = store.insert_route("r", route(65002, "10.0.0.0/16")?)?;
    store.ensure_index("r")?;

    let vrp_id = store.insert_vrp("v", vrp(65001, "10.0.0.0/8", 16)?)?;

    let report = validate(&store, &coordinator, "r", "v", true)?;
    assert_eq!(report.vrps, 1);
    assert_eq!(report.updates, 3);

    let routes = store.routes("r")?;
    let validity_of = |id: RecordId| {
        routes
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.value.validity)
    };
    assert_eq!(validity_of(valid), Some(Validity::Valid));
    assert_eq!(validity_of(too_long), Some(Validity::RangeLengthExceeded));
    assert_eq!(validity_of(other_asn), Some(Validity::AsnMismatch));

    for r in &routes {
        assert_eq!(r.value.matched_vrps, vec![vrp_id]);
    }

    assert_eq!(report.tally.get(Validity::Valid), 1);
    assert_eq!(report.tally.get(Validity::RangeLengthExceeded), 1);
    assert_eq!(report.tally.get(Validity::AsnMismatch), 1);

    Ok(())
}

#[test]
fn test_non_candidates_untouched() -> Result<(), Box<dyn std::error::Error>> {
    crate::common::init();

    let store = MemoryStore::new();
    let coordinator = Coordinator::new(2)?;

    // Neighbours of the VRP prefix, a less specific and the same bits in
    // the other family.
    for r in [
        route(65001, "11.0.0.0/8")?,
        route(65001, "10.128.0.0/9")?,
        route(65001, "10.0.0.0/8")?,
        route(65001, "a00::/8")?,
    ] {
        store.insert_route("r", r)?;
    }
    let covered = store.insert_route("r", route(65001, "10.0.0.0/16")?)?;
    store.ensure_index("r")?;
    store.insert_vrp("v", vrp(65001, "10.0.0.0/9", 16)?)?;

    validate(&store, &coordinator, "r", "v", true)?;

    for r in store.routes("r")? {
        if r.id == covered {
            assert_eq!(r.value.validity, Validity::Valid);
        } else {
            assert_eq!(r.value.validity, Validity::Unknown, "{}", r.value);
            assert!(r.value.matched_vrps.is_empty());
        }
    }

    Ok(())
}

#[test]
fn test_rerun_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
    crate::common::init();

    let store = MemoryStore::new();
    let coordinator = Coordinator::new(3)?;
    store.insert_route("r", route(65001, "10.0.0.0/24")?)?;
    store.insert_route("r", route(65002, "10.1.0.0/16")?)?;
    store.ensure_index("r")?;
    store.insert_vrp("v", vrp(65001, "10.0.0.0/8", 24)?)?;
    store.insert_vrp("v", vrp(65003, "10.0.0.0/8", 24)?)?;

    let first = validate(&store, &coordinator, "r", "v", true)?;
    let snapshot = store.routes("r")?;
    let second = validate(&store, &coordinator, "r", "v", true)?;

    assert_eq!(first.tally, second.tally);
    for (a, b) in snapshot.iter().zip(store.routes("r")?.iter()) {
        assert_eq!(a.value.validity, b.value.validity);
        assert_eq!(a.value.matched_vrps.len(), 2);
        assert_eq!(b.value.matched_vrps.len(), 2);
    }

    // Without the reset, the trail keeps growing.
    validate(&store, &coordinator, "r", "v", false)?;
    for r in store.routes("r")? {
        assert_eq!(r.value.matched_vrps.len(), 4);
    }

    Ok(())
}
