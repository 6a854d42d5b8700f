//! Boundary parsing: loose JSON from extractors and lookups into typed records.
//!
//! Contact parsing never fails. Anything that is not usable is dropped or
//! treated as absent, so the reconciler only ever sees `Contact` values.

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ReconError;
use crate::model::{AgencyProfile, Award, CaseStudy, ClientRef, Contact};

/// Parse a JSON array of contact-like objects.
///
/// Non-object items are skipped. A non-string `name` becomes an empty name
/// (the reconciler will discard it from a secondary list). Non-string
/// optional fields are treated as absent. `linkedin` is accepted for
/// `linkedin_url`.
pub fn contacts_from_json(value: &Value) -> Vec<Contact> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(Value::as_object)
        .map(contact_from_object)
        .collect()
}

fn contact_from_object(obj: &Map<String, Value>) -> Contact {
    Contact {
        name: string_field(obj, "name").unwrap_or_default(),
        role: string_field(obj, "role"),
        email: string_field(obj, "email"),
        linkedin_url: string_field(obj, "linkedin_url").or_else(|| string_field(obj, "linkedin")),
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Parse an extractor's JSON object into an [`AgencyProfile`].
///
/// Fails only when the value is not an object. Each field is coerced on its
/// own so one badly typed field never costs the rest of the profile:
/// scalars become strings, a lone string becomes a one-element list, a bare
/// client/case study/award string becomes a record with that name. Anything
/// else is dropped with a warning.
pub fn profile_from_json(value: &Value) -> Result<AgencyProfile, ReconError> {
    let Some(obj) = value.as_object() else {
        return Err(ReconError::Malformed(format!(
            "expected a JSON object, got {}",
            type_name(value)
        )));
    };

    let specializations_key = if obj.contains_key("specializations") {
        "specializations"
    } else {
        "services"
    };

    Ok(AgencyProfile {
        name: text_field(obj, "name").unwrap_or_default(),
        description: text_field(obj, "description").unwrap_or_default(),
        website: text_field(obj, "website").unwrap_or_default(),
        partner_page_url: text_field(obj, "partner_page_url"),
        specializations: text_list_field(obj, specializations_key),
        platforms: text_list_field(obj, "platforms"),
        partners: text_list_field(obj, "partners"),
        clients: record_list_field(obj, "clients", client_from_value),
        case_studies: record_list_field(obj, "case_studies", case_study_from_value),
        revenue_estimate: text_field(obj, "revenue_estimate"),
        awards: record_list_field(obj, "awards", award_from_value),
        directors: obj.get("directors").map(contacts_from_json).unwrap_or_default(),
        last_analyzed: text_field(obj, "last_analyzed"),
    })
}

/// Scalar as text. `None` for null, arrays and objects.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn text_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    let value = obj.get(key)?;
    let text = scalar_text(value);
    if text.is_none() && !value.is_null() {
        dropped(key, value);
    }
    text
}

fn text_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Null => Some(Vec::new()),
        Value::Array(items) => Some(items.iter().filter_map(scalar_text).collect()),
        Value::Object(_) => None,
        scalar => scalar_text(scalar).map(|s| vec![s]),
    }
}

fn text_list_field(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    let Some(value) = obj.get(key) else {
        return Vec::new();
    };
    text_list(value).unwrap_or_else(|| {
        dropped(key, value);
        Vec::new()
    })
}

/// A list of records; a single record (object or bare string) is wrapped.
/// Items that convert to nothing are skipped.
fn record_list_field<T>(
    obj: &Map<String, Value>,
    key: &str,
    convert: fn(&Value) -> Option<T>,
) -> Vec<T> {
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter_map(convert).collect(),
        Some(single) => match convert(single) {
            Some(record) => vec![record],
            None => {
                dropped(key, single);
                Vec::new()
            }
        },
    }
}

fn client_from_value(value: &Value) -> Option<ClientRef> {
    match value {
        Value::Object(o) => Some(ClientRef {
            name: text_field(o, "name").unwrap_or_default(),
            industry: text_field(o, "industry"),
            platform: text_field(o, "platform"),
            project_summary: text_field(o, "project_summary"),
        }),
        other => scalar_text(other).map(|name| ClientRef {
            name,
            ..ClientRef::default()
        }),
    }
}

fn case_study_from_value(value: &Value) -> Option<CaseStudy> {
    match value {
        Value::Object(o) => Some(CaseStudy {
            title: text_field(o, "title").unwrap_or_default(),
            url: text_field(o, "url"),
            results: text_list_field(o, "results"),
        }),
        other => scalar_text(other).map(|title| CaseStudy {
            title,
            ..CaseStudy::default()
        }),
    }
}

fn award_from_value(value: &Value) -> Option<Award> {
    match value {
        Value::Object(o) => Some(Award {
            name: text_field(o, "name").unwrap_or_default(),
            year: text_field(o, "year"),
        }),
        other => scalar_text(other).map(|name| Award { name, year: None }),
    }
}

fn dropped(key: &str, value: &Value) {
    warn!(field = key, found = type_name(value), "dropping profile field with unusable shape");
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_contacts() {
        let v = json!([
            {"name": "Amy Lee", "role": "CEO", "email": "amy@co.com", "linkedin_url": "https://l/amy"},
            {"name": "Tom Ng", "linkedin": "https://l/tom"}
        ]);
        let contacts = contacts_from_json(&v);
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].role.as_deref(), Some("CEO"));
        assert_eq!(contacts[1].linkedin_url.as_deref(), Some("https://l/tom"));
    }

    #[test]
    fn non_string_name_becomes_empty() {
        let v = json!([{"name": 42, "email": "x@co.com"}, {"email": "y@co.com"}]);
        let contacts = contacts_from_json(&v);
        assert_eq!(contacts.len(), 2);
        assert!(contacts.iter().all(|c| !c.has_name()));
    }

    #[test]
    fn non_string_fields_are_absent() {
        let v = json!([{"name": "Amy Lee", "email": null, "role": ["CEO"]}]);
        let contacts = contacts_from_json(&v);
        assert_eq!(contacts[0], Contact::named("Amy Lee"));
    }

    #[test]
    fn skips_non_objects_and_non_arrays() {
        assert!(contacts_from_json(&json!({"name": "Amy"})).is_empty());
        assert!(contacts_from_json(&Value::Null).is_empty());
        let contacts = contacts_from_json(&json!(["Amy Lee", 7, {"name": "Bo"}]));
        assert_eq!(contacts, vec![Contact::named("Bo")]);
    }

    #[test]
    fn profile_with_loose_directors_and_numeric_years() {
        let v = json!({
            "name": "Velstar",
            "website": "https://velstar.co.uk",
            "services": ["Shopify builds"],
            "awards": [{"name": "Best Agency", "year": 2023}],
            "directors": [{"name": "Amy Lee", "role": "CEO"}, {"name": null}]
        });
        let profile = profile_from_json(&v).unwrap();
        assert_eq!(profile.awards[0].year.as_deref(), Some("2023"));
        assert_eq!(profile.directors.len(), 2);
        assert_eq!(profile.specializations, vec!["Shopify builds"]);
    }

    #[test]
    fn numeric_scalar_becomes_text() {
        let v = json!({
            "name": "Velstar",
            "revenue_estimate": 5000000,
            "directors": [{"name": "Amy Lee"}]
        });
        let profile = profile_from_json(&v).unwrap();
        assert_eq!(profile.revenue_estimate.as_deref(), Some("5000000"));
        assert_eq!(profile.directors, vec![Contact::named("Amy Lee")]);
    }

    #[test]
    fn string_clients_become_named_records() {
        let v = json!({"name": "Velstar", "clients": ["Nike", {"name": "Adidas", "industry": "Sport"}, 7, []]});
        let profile = profile_from_json(&v).unwrap();
        let names: Vec<_> = profile.clients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Nike", "Adidas", "7"]);
        assert_eq!(profile.clients[1].industry.as_deref(), Some("Sport"));
    }

    #[test]
    fn lone_string_becomes_one_element_list() {
        let v = json!({
            "name": "Velstar",
            "platforms": "Shopify",
            "case_studies": [{"title": "Gymshark", "results": "Up 20%"}]
        });
        let profile = profile_from_json(&v).unwrap();
        assert_eq!(profile.platforms, vec!["Shopify"]);
        assert_eq!(profile.case_studies[0].results, vec!["Up 20%"]);
    }

    #[test]
    fn single_record_is_wrapped() {
        let v = json!({"name": "Velstar", "awards": {"name": "Best Agency", "year": 2023}, "clients": "Nike"});
        let profile = profile_from_json(&v).unwrap();
        assert_eq!(profile.awards.len(), 1);
        assert_eq!(profile.awards[0].year.as_deref(), Some("2023"));
        assert_eq!(profile.clients[0].name, "Nike");
    }

    #[test]
    fn unusable_fields_are_dropped_not_fatal() {
        let v = json!({
            "name": "Velstar",
            "description": {"text": "nested"},
            "revenue_estimate": ["$1M", "$2M"],
            "partners": {"Klaviyo": true},
            "platforms": [{"id": 1}, "Shopify"],
            "directors": [{"name": "Amy Lee", "role": "CEO"}]
        });
        let profile = profile_from_json(&v).unwrap();
        assert_eq!(profile.name, "Velstar");
        assert!(profile.description.is_empty());
        assert_eq!(profile.revenue_estimate, None);
        assert!(profile.partners.is_empty());
        assert_eq!(profile.platforms, vec!["Shopify"]);
        assert_eq!(profile.directors, vec![Contact::named("Amy Lee").with_role("CEO")]);
    }

    #[test]
    fn services_and_specializations_are_aliases() {
        let v = json!({"name": "Velstar", "specializations": ["SEO"], "services": ["PPC"]});
        assert_eq!(profile_from_json(&v).unwrap().specializations, vec!["SEO"]);
    }

    #[test]
    fn profile_rejects_non_object() {
        let err = profile_from_json(&json!(["nope"])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }
}
