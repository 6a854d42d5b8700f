//! `athos reconcile`: offline merge of two contact files.

use std::fs;
use std::io::Write;
use std::path::Path;

use athos_recon::{contacts_from_json, Contact, Reconciled};
use clap::ValueEnum;
use serde_json::Value;

use crate::CliError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RosterFormat {
    Json,
    Csv,
}

/// Load contacts from a JSON file.
///
/// Accepts a bare array of contacts, a profile object with `directors`, or
/// a lookup response shaped `{"contacts": [...]}`. Entries that are not
/// objects are skipped by the boundary parser.
pub fn load_contacts(path: &Path) -> Result<Vec<Contact>, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e)))?;
    let value: Value = serde_json::from_str(&text)
        .map_err(|e| CliError::parse(format!("{}: invalid JSON: {}", path.display(), e)))?;

    let list = match &value {
        Value::Array(_) => &value,
        Value::Object(map) => map
            .get("directors")
            .or_else(|| map.get("contacts"))
            .ok_or_else(|| {
                CliError::parse(format!(
                    "{}: expected an array or an object with \"directors\" or \"contacts\"",
                    path.display()
                ))
            })?,
        _ => {
            return Err(CliError::parse(format!(
                "{}: expected a JSON array of contacts",
                path.display()
            )))
        }
    };

    Ok(contacts_from_json(list))
}

/// Write the reconciled roster. JSON includes the summary; CSV is the
/// roster only, one row per contact, empty cells for absent fields.
pub fn write_roster(
    reconciled: &Reconciled,
    format: RosterFormat,
    out: impl Write,
) -> Result<(), CliError> {
    match format {
        RosterFormat::Json => write_json(reconciled, out),
        RosterFormat::Csv => write_csv(&reconciled.contacts, out),
    }
}

fn write_json(reconciled: &Reconciled, mut out: impl Write) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut out, reconciled)
        .map_err(|e| CliError::io(format!("JSON write error: {e}")))?;
    writeln!(out).map_err(|e| CliError::io(e.to_string()))
}

fn write_csv(contacts: &[Contact], out: impl Write) -> Result<(), CliError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    writer
        .write_record(["name", "role", "email", "linkedin_url"])
        .map_err(|e| CliError::io(format!("CSV write error: {e}")))?;
    for c in contacts {
        writer
            .write_record([
                c.name.as_str(),
                c.role.as_deref().unwrap_or(""),
                c.email.as_deref().unwrap_or(""),
                c.linkedin_url.as_deref().unwrap_or(""),
            ])
            .map_err(|e| CliError::io(format!("CSV write error: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| CliError::io(format!("CSV flush error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use athos_recon::reconcile_with_summary;

    fn write_temp(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn loads_array_and_profile_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let array = write_temp(&dir, "a.json", r#"[{"name": "Amy Lee"}, 42]"#);
        let profile = write_temp(
            &dir,
            "p.json",
            r#"{"name": "Velstar", "directors": [{"name": "Tom Ng", "linkedin": "https://linkedin.com/in/tom"}]}"#,
        );

        assert_eq!(load_contacts(&array).unwrap(), vec![Contact::named("Amy Lee")]);
        let from_profile = load_contacts(&profile).unwrap();
        assert_eq!(from_profile[0].linkedin_url.as_deref(), Some("https://linkedin.com/in/tom"));
    }

    #[test]
    fn rejects_scalar_and_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let scalar = write_temp(&dir, "s.json", "\"hello\"");
        let broken = write_temp(&dir, "b.json", "[{");
        let object = write_temp(&dir, "o.json", r#"{"name": "Velstar"}"#);

        assert_eq!(load_contacts(&scalar).unwrap_err().code, exit_codes::EXIT_PARSE);
        assert_eq!(load_contacts(&broken).unwrap_err().code, exit_codes::EXIT_PARSE);
        assert_eq!(load_contacts(&object).unwrap_err().code, exit_codes::EXIT_PARSE);
        assert_eq!(
            load_contacts(&dir.path().join("missing.json")).unwrap_err().code,
            exit_codes::EXIT_IO
        );
    }

    #[test]
    fn csv_has_header_and_empty_cells() {
        let reconciled = reconcile_with_summary(
            &[Contact::named("Amy Lee").with_role("CEO")],
            &[Contact::named("Tom Ng").with_email("tom@co.com")],
        );
        let mut buf = Vec::new();
        write_roster(&reconciled, RosterFormat::Csv, &mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "name,role,email,linkedin_url\nAmy Lee,CEO,,\nTom Ng,,tom@co.com,\n"
        );
    }

    #[test]
    fn json_includes_summary() {
        let reconciled = reconcile_with_summary(&[Contact::named("Amy Lee")], &[]);
        let mut buf = Vec::new();
        write_roster(&reconciled, RosterFormat::Json, &mut buf).unwrap();
        let value: Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["summary"]["primary_in"], 1);
        assert_eq!(value["contacts"][0]["name"], "Amy Lee");
    }
}
