use serde::{Deserialize, Deserializer, Serialize};

/// Model output routinely carries `null` where a list or string belongs.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// One person associated with an organization.
///
/// `name` is the identity key. An absent name is represented as an empty
/// string; such a contact never takes part in matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, alias = "linkedin", skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
}

impl Contact {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_linkedin(mut self, url: impl Into<String>) -> Self {
        self.linkedin_url = Some(url.into());
        self
    }

    /// True when the name is usable as an identity key.
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// A field is empty when absent or whitespace-only.
pub fn is_empty_field(field: &Option<String>) -> bool {
    field.as_deref().map_or(true, |v| v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Agency profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseStudy {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Award {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

/// Organization metadata plus the contact roster, as stored by the sink.
///
/// `directors` holds the extractor's contacts until enrichment, and the
/// reconciled roster afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgencyProfile {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub website: String,
    #[serde(default)]
    pub partner_page_url: Option<String>,
    /// Extractors answer with either `services` or `specializations`.
    #[serde(default, alias = "services", deserialize_with = "null_as_default")]
    pub specializations: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub platforms: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub partners: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clients: Vec<ClientRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub case_studies: Vec<CaseStudy>,
    #[serde(default)]
    pub revenue_estimate: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub awards: Vec<Award>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub directors: Vec<Contact>,
    #[serde(default)]
    pub last_analyzed: Option<String>,
}

// ---------------------------------------------------------------------------
// Reconciliation output
// ---------------------------------------------------------------------------

/// Counters describing what a reconciliation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub primary_in: usize,
    pub secondary_in: usize,
    /// Secondary entries that merged into an existing roster entry.
    pub matched: usize,
    pub fields_filled: usize,
    pub appended: usize,
    pub discarded_unnamed: usize,
    pub primary_duplicates_collapsed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    pub contacts: Vec<Contact>,
    pub summary: ReconcileSummary,
}
