use std::collections::HashMap;

use crate::model::{is_empty_field, Contact, ReconcileSummary, Reconciled};

/// Identity key for a contact name: trimmed and lowercased.
///
/// Interior whitespace is left alone, so "Jane  Doe" and "Jane Doe" are
/// different people as far as matching is concerned.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Merge a secondary contact list into a primary one.
///
/// See [`reconcile_with_summary`] for the rules.
pub fn reconcile(primary: &[Contact], secondary: &[Contact]) -> Vec<Contact> {
    reconcile_with_summary(primary, secondary).contacts
}

/// Merge `secondary` into a working copy of `primary` and report what happened.
///
/// - Identity is [`normalize_name`]. The first primary entry holding a name
///   owns it; later primary entries with the same name fill its empty fields
///   and are dropped.
/// - Unnamed primary entries pass through at their position, unmatched.
/// - Unnamed secondary entries are discarded.
/// - A matched secondary entry fills `email`, `linkedin_url` and `role` only
///   where the roster entry has them empty. Non-empty fields are never
///   overwritten.
/// - An unmatched secondary entry is appended and becomes matchable for the
///   rest of the secondary list.
///
/// Output order is primary order followed by appended secondary entries in
/// their input order.
pub fn reconcile_with_summary(primary: &[Contact], secondary: &[Contact]) -> Reconciled {
    let mut summary = ReconcileSummary {
        primary_in: primary.len(),
        secondary_in: secondary.len(),
        ..ReconcileSummary::default()
    };

    let mut roster: Vec<Contact> = Vec::with_capacity(primary.len() + secondary.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for contact in primary {
        if !contact.has_name() {
            roster.push(contact.clone());
            continue;
        }
        let key = normalize_name(&contact.name);
        match index.get(&key) {
            Some(&slot) => {
                summary.fields_filled += fill_gaps(&mut roster[slot], contact);
                summary.primary_duplicates_collapsed += 1;
            }
            None => {
                index.insert(key, roster.len());
                roster.push(contact.clone());
            }
        }
    }

    for candidate in secondary {
        if !candidate.has_name() {
            summary.discarded_unnamed += 1;
            continue;
        }
        let key = normalize_name(&candidate.name);
        match index.get(&key) {
            Some(&slot) => {
                summary.fields_filled += fill_gaps(&mut roster[slot], candidate);
                summary.matched += 1;
            }
            None => {
                index.insert(key, roster.len());
                roster.push(candidate.clone());
                summary.appended += 1;
            }
        }
    }

    Reconciled {
        contacts: roster,
        summary,
    }
}

/// Copy each of `email`, `linkedin_url`, `role` from `source` into `target`
/// where the target's is empty and the source's is not. Returns the number
/// of fields written.
fn fill_gaps(target: &mut Contact, source: &Contact) -> usize {
    fill_field(&mut target.email, &source.email)
        + fill_field(&mut target.linkedin_url, &source.linkedin_url)
        + fill_field(&mut target.role, &source.role)
}

fn fill_field(target: &mut Option<String>, source: &Option<String>) -> usize {
    if is_empty_field(target) && !is_empty_field(source) {
        *target = source.clone();
        1
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_name("  Jane Doe "), "jane doe");
        assert_eq!(normalize_name("JANE DOE"), "jane doe");
        assert_eq!(normalize_name("Jane  Doe"), "jane  doe");
    }

    #[test]
    fn scenario_amy_and_tom() {
        let primary = vec![Contact::named("Amy Lee").with_role("CEO")];
        let secondary = vec![
            Contact::named("Amy Lee").with_email("amy@co.com"),
            Contact::named("Tom Ng").with_email("tom@co.com").with_role("CTO"),
        ];

        let out = reconcile(&primary, &secondary);

        assert_eq!(
            out,
            vec![
                Contact::named("Amy Lee").with_role("CEO").with_email("amy@co.com"),
                Contact::named("Tom Ng").with_email("tom@co.com").with_role("CTO"),
            ]
        );
    }

    #[test]
    fn fills_empty_string_field() {
        let primary = vec![Contact::named("Jane Doe").with_email("")];
        let secondary = vec![Contact::named("jane doe").with_email("jane@x.com")];

        let out = reconcile(&primary, &secondary);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Jane Doe");
        assert_eq!(out[0].email.as_deref(), Some("jane@x.com"));
    }

    #[test]
    fn never_clobbers_non_empty_fields() {
        let primary = vec![Contact::named("Amy Lee")
            .with_role("CEO")
            .with_email("amy@old.com")
            .with_linkedin("https://linkedin.com/in/amy")];
        let secondary = vec![Contact::named("AMY LEE")
            .with_role("Employee")
            .with_email("amy@new.com")
            .with_linkedin("https://linkedin.com/in/other")];

        let result = reconcile_with_summary(&primary, &secondary);

        assert_eq!(result.contacts, primary);
        assert_eq!(result.summary.matched, 1);
        assert_eq!(result.summary.fields_filled, 0);
    }

    #[test]
    fn blank_secondary_value_does_not_fill() {
        let primary = vec![Contact::named("Amy Lee")];
        let secondary = vec![Contact::named("Amy Lee").with_email("  ")];

        let out = reconcile(&primary, &secondary);
        assert_eq!(out[0].email, None);
    }

    #[test]
    fn whitespace_variants_match_one_identity() {
        let primary = vec![Contact::named("Jane Doe")];
        let secondary = vec![
            Contact::named("jane doe").with_email("a@x.com"),
            Contact::named(" Jane Doe ").with_role("COO"),
        ];

        let out = reconcile(&primary, &secondary);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].email.as_deref(), Some("a@x.com"));
        assert_eq!(out[0].role.as_deref(), Some("COO"));
    }

    #[test]
    fn discards_unnamed_secondary() {
        let primary = vec![Contact::named("Amy Lee")];
        let secondary = vec![
            Contact::default().with_email("ghost@co.com"),
            Contact::named("   ").with_email("blank@co.com"),
        ];

        let result = reconcile_with_summary(&primary, &secondary);

        assert_eq!(result.contacts, primary);
        assert_eq!(result.summary.discarded_unnamed, 2);
        assert_eq!(result.summary.appended, 0);
    }

    #[test]
    fn appended_entry_absorbs_later_duplicates() {
        let secondary = vec![
            Contact::named("Tom Ng").with_email("tom@co.com"),
            Contact::named("tom ng").with_role("CTO").with_email("other@co.com"),
        ];

        let result = reconcile_with_summary(&[], &secondary);

        assert_eq!(
            result.contacts,
            vec![Contact::named("Tom Ng").with_email("tom@co.com").with_role("CTO")]
        );
        assert_eq!(result.summary.appended, 1);
        assert_eq!(result.summary.matched, 1);
    }

    #[test]
    fn primary_duplicates_keep_first() {
        let primary = vec![
            Contact::named("Amy Lee").with_role("CEO"),
            Contact::named("Bo Chan"),
            Contact::named("amy lee").with_role("Founder").with_email("amy@co.com"),
        ];

        let result = reconcile_with_summary(&primary, &[]);

        assert_eq!(
            result.contacts,
            vec![
                Contact::named("Amy Lee").with_role("CEO").with_email("amy@co.com"),
                Contact::named("Bo Chan"),
            ]
        );
        assert_eq!(result.summary.primary_duplicates_collapsed, 1);
    }

    #[test]
    fn unnamed_primary_passes_through_in_place() {
        let primary = vec![
            Contact::named("Amy Lee"),
            Contact::default().with_email("info@co.com"),
            Contact::named("Bo Chan"),
        ];
        let secondary = vec![Contact::default().with_role("CEO")];

        let out = reconcile(&primary, &secondary);

        assert_eq!(out, primary);
    }

    #[test]
    fn order_is_primary_then_new_secondary() {
        let primary = vec![Contact::named("B"), Contact::named("A")];
        let secondary = vec![
            Contact::named("Z"),
            Contact::named("a"),
            Contact::named("Y"),
        ];

        let names: Vec<String> = reconcile(&primary, &secondary)
            .into_iter()
            .map(|c| c.name)
            .collect();

        assert_eq!(names, vec!["B", "A", "Z", "Y"]);
    }

    #[test]
    fn empty_inputs() {
        assert!(reconcile(&[], &[]).is_empty());

        let secondary = vec![Contact::named("Tom Ng"), Contact::default()];
        assert_eq!(reconcile(&[], &secondary), vec![Contact::named("Tom Ng")]);

        let primary = vec![Contact::named("Amy Lee")];
        assert_eq!(reconcile(&primary, &[]), primary);
    }

    #[test]
    fn inputs_are_not_mutated() {
        let primary = vec![Contact::named("Amy Lee")];
        let secondary = vec![Contact::named("Amy Lee").with_email("amy@co.com")];
        let primary_before = primary.clone();
        let secondary_before = secondary.clone();

        let _ = reconcile(&primary, &secondary);

        assert_eq!(primary, primary_before);
        assert_eq!(secondary, secondary_before);
    }

    #[test]
    fn reapplying_secondary_is_a_no_op() {
        let primary = vec![Contact::named("Amy Lee").with_role("CEO")];
        let secondary = vec![
            Contact::named("amy lee").with_email("amy@co.com"),
            Contact::named("Tom Ng").with_role("CTO"),
        ];

        let once = reconcile(&primary, &secondary);
        let twice = reconcile(&once, &secondary);

        assert_eq!(once, twice);
    }
}
