// Property-based tests for contact reconciliation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use athos_recon::{normalize_name, reconcile, Contact};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Names drawn from a small pool so collisions (in case and padding) are common.
fn arb_name() -> impl Strategy<Value = String> {
    let base = prop_oneof![
        Just("amy lee"),
        Just("tom ng"),
        Just("bo chan"),
        Just("cara diaz"),
    ];
    (base, any::<bool>(), 0usize..3, 0usize..3).prop_map(|(name, upper, left, right)| {
        let name = if upper { name.to_uppercase() } else { name.to_string() };
        format!("{}{}{}", " ".repeat(left), name, " ".repeat(right))
    })
}

fn arb_field() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        2 => Just(None),
        1 => Just(Some(String::new())),
        1 => Just(Some("  ".to_string())),
        3 => "[a-z]{1,6}".prop_map(Some),
    ]
}

fn arb_contact() -> impl Strategy<Value = Contact> {
    let name = prop_oneof![
        6 => arb_name(),
        1 => Just(String::new()),
        1 => Just("   ".to_string()),
    ];
    (name, arb_field(), arb_field(), arb_field()).prop_map(|(name, role, email, linkedin_url)| {
        Contact {
            name,
            role,
            email,
            linkedin_url,
        }
    })
}

fn arb_list() -> impl Strategy<Value = Vec<Contact>> {
    prop::collection::vec(arb_contact(), 0..8)
}

fn non_empty(field: &Option<String>) -> bool {
    field.as_deref().map_or(false, |v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn reapplying_secondary_changes_nothing(p in arb_list(), s in arb_list()) {
        let once = reconcile(&p, &s);
        let twice = reconcile(&once, &s);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn named_entries_are_unique(p in arb_list(), s in arb_list()) {
        let out = reconcile(&p, &s);
        let mut seen = HashSet::new();
        for c in out.iter().filter(|c| c.has_name()) {
            prop_assert!(seen.insert(normalize_name(&c.name)), "duplicate {:?}", c.name);
        }
    }

    #[test]
    fn first_primary_fields_are_never_clobbered(p in arb_list(), s in arb_list()) {
        let out = reconcile(&p, &s);
        let mut seen = HashSet::new();
        for original in p.iter().filter(|c| c.has_name()) {
            let key = normalize_name(&original.name);
            if !seen.insert(key.clone()) {
                continue;
            }
            let merged = out
                .iter()
                .find(|c| c.has_name() && normalize_name(&c.name) == key)
                .expect("primary identity must survive");
            prop_assert_eq!(&merged.name, &original.name);
            if non_empty(&original.email) {
                prop_assert_eq!(&merged.email, &original.email);
            }
            if non_empty(&original.role) {
                prop_assert_eq!(&merged.role, &original.role);
            }
            if non_empty(&original.linkedin_url) {
                prop_assert_eq!(&merged.linkedin_url, &original.linkedin_url);
            }
        }
    }

    #[test]
    fn unnamed_secondary_never_appears(p in arb_list(), s in arb_list()) {
        let out = reconcile(&p, &s);
        let unnamed_in_primary = p.iter().filter(|c| !c.has_name()).count();
        let unnamed_in_output = out.iter().filter(|c| !c.has_name()).count();
        prop_assert_eq!(unnamed_in_primary, unnamed_in_output);
    }

    #[test]
    fn output_starts_with_primary_identities_in_order(p in arb_list(), s in arb_list()) {
        let out = reconcile(&p, &s);

        let mut seen = HashSet::new();
        let expected_prefix: Vec<String> = p
            .iter()
            .filter(|c| !c.has_name() || seen.insert(normalize_name(&c.name)))
            .map(|c| normalize_name(&c.name))
            .collect();
        let actual_prefix: Vec<String> = out
            .iter()
            .take(expected_prefix.len())
            .map(|c| normalize_name(&c.name))
            .collect();
        prop_assert_eq!(expected_prefix, actual_prefix);

        let primary_keys: HashSet<String> = p
            .iter()
            .filter(|c| c.has_name())
            .map(|c| normalize_name(&c.name))
            .collect();
        let mut appended_seen = HashSet::new();
        let expected_tail: Vec<String> = s
            .iter()
            .filter(|c| c.has_name())
            .map(|c| normalize_name(&c.name))
            .filter(|k| !primary_keys.contains(k) && appended_seen.insert(k.clone()))
            .collect();
        let actual_tail: Vec<String> = out
            .iter()
            .skip(out.len() - expected_tail.len())
            .map(|c| normalize_name(&c.name))
            .collect();
        prop_assert_eq!(expected_tail, actual_tail);
    }
}
