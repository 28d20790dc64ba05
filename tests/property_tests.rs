//! Property-based tests for versions, spec identity, and the fault
//! model.
//!
//! These use proptest to verify invariants across randomly generated
//! inputs.

use std::sync::atomic::{AtomicUsize, Ordering};

use proptest::prelude::*;

use specbind::data::{Data, Extrinsics};
use specbind::fault::{sift, Fault, FaultKind};
use specbind::version::Version;
use specbind::Spec;

/// Strategy for a URL path segment.
fn path_segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,9}"
}

proptest! {
    /// Parsing accepts both the bare and the `v`-prefixed spelling.
    #[test]
    fn version_parse_accepts_both_spellings(major in 0u64..10_000, minor in 0u64..10_000) {
        let bare = Version::parse(&format!("{major}.{minor}")).unwrap();
        let prefixed = Version::parse(&format!("v{major}.{minor}")).unwrap();
        prop_assert_eq!(bare, Version::new(major, minor));
        prop_assert_eq!(bare, prefixed);
    }

    /// Display round-trips through parse.
    #[test]
    fn version_display_round_trips(major in 0u64..10_000, minor in 0u64..10_000) {
        let version = Version::new(major, minor);
        prop_assert_eq!(Version::parse(&version.to_string()).unwrap(), version);
    }

    /// Within a major series >= 1, satisfaction is exactly `minor >=
    /// requested.minor`.
    #[test]
    fn version_satisfaction_orders_minors(major in 1u64..100, a in 0u64..100, b in 0u64..100) {
        let provided = Version::new(major, a);
        let requested = Version::new(major, b);
        prop_assert_eq!(provided.satisfies(&requested), a >= b);
    }

    /// Different majors never satisfy each other.
    #[test]
    fn version_satisfaction_never_crosses_majors(
        a in 0u64..100,
        b in 0u64..100,
        minor_a in 0u64..100,
        minor_b in 0u64..100,
    ) {
        prop_assume!(a != b);
        prop_assert!(!Version::new(a, minor_a).satisfies(&Version::new(b, minor_b)));
    }

    /// Series 0 satisfies only its exact minor.
    #[test]
    fn version_series_zero_is_exact(a in 0u64..100, b in 0u64..100) {
        prop_assert_eq!(Version::new(0, a).satisfies(&Version::new(0, b)), a == b);
    }

    /// Any valid spec URL round-trips: `identity + "/" + version` is the
    /// original URL.
    #[test]
    fn spec_urls_round_trip(
        host in "[a-z]{1,8}",
        prefix in proptest::collection::vec(path_segment(), 0..3),
        name in path_segment(),
        major in 0u64..1000,
        minor in 0u64..1000,
    ) {
        let mut path = prefix.clone();
        path.push(name.clone());
        let url = format!(
            "https://{host}.example/{}/v{major}.{minor}",
            path.join("/"),
        );
        let spec = Spec::decode(&url).unwrap();
        prop_assert_eq!(spec.name(), name.as_str());
        prop_assert_eq!(spec.version(), Version::new(major, minor));
        prop_assert_eq!(format!("{}/{}", spec.identity(), spec.version()), url);
    }

    /// Fragment, query, and credentials never reach the identity.
    #[test]
    fn spec_identity_is_normalized(
        host in "[a-z]{1,8}",
        name in path_segment(),
        user in "[a-z]{1,6}",
        query in "[a-z]{1,6}",
    ) {
        let plain = format!("https://{host}.example/{name}/v1.0");
        let noisy = format!("https://{user}:pw@{host}.example/{name}/v1.0?{query}=1#frag");
        let a = Spec::decode(&plain).unwrap();
        let b = Spec::decode(&noisy).unwrap();
        prop_assert_eq!(a.identity(), b.identity());
        prop_assert_eq!(a, b);
    }

    /// Specs round-trip through their serde string form.
    #[test]
    fn spec_serde_round_trips(
        host in "[a-z]{1,8}",
        name in path_segment(),
        major in 0u64..1000,
        minor in 0u64..1000,
    ) {
        let url = format!("https://{host}.example/{name}/v{major}.{minor}");
        let spec = Spec::decode(&url).unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        prop_assert_eq!(json, format!("\"{url}\""));
        let parsed: Spec = serde_json::from_str(&format!("\"{url}\"")).unwrap();
        prop_assert_eq!(parsed, spec);
    }

    /// Versions round-trip through their serde string form.
    #[test]
    fn version_serde_round_trips(major in 0u64..10_000, minor in 0u64..10_000) {
        let version = Version::new(major, minor);
        let json = serde_json::to_string(&version).unwrap();
        let parsed: Version = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(parsed, version);
    }

    /// `sift` keeps every input, split by outcome, in order.
    #[test]
    fn sift_preserves_length_and_order(outcomes in proptest::collection::vec(any::<bool>(), 0..50)) {
        let results = outcomes.iter().enumerate().map(|(index, ok)| {
            if *ok {
                Ok(index)
            } else {
                Err(Fault::new(FaultKind::ReadIntRange {
                    repr: index.to_string(),
                }))
            }
        });
        let (faults, values) = sift(results);
        let expected_errors = outcomes.iter().filter(|ok| !**ok).count();
        prop_assert_eq!(faults.len(), expected_errors);
        prop_assert_eq!(values.len(), outcomes.len() - expected_errors);
        prop_assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
        let fault_indices: Vec<usize> = faults
            .iter()
            .map(|fault| match fault.kind() {
                FaultKind::ReadIntRange { repr } => repr.parse().unwrap(),
                _ => unreachable!(),
            })
            .collect();
        prop_assert!(fault_indices.windows(2).all(|pair| pair[0] < pair[1]));
    }

    /// Memoized reads return one stable value no matter how often they
    /// run, even though the initializer is non-deterministic.
    #[test]
    fn memoized_reads_are_idempotent(reads in 1usize..20) {
        static TICKS: AtomicUsize = AtomicUsize::new(0);

        fn tick(_: &Extrinsics, _: &String) -> usize {
            TICKS.fetch_add(1, Ordering::SeqCst)
        }

        let store = Extrinsics::new();
        let memo = Data::<usize, String>::declare("tick").or_else(tick);
        let target = "doc".to_string();
        let first = memo.get(&store, &target);
        for _ in 0..reads {
            prop_assert_eq!(memo.get(&store, &target), first);
        }
    }
}
