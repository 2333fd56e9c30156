//! Template field to dataset column mapping

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dataset::Row;

/// Field name to value payload sent to the document generator for one row
pub type FieldValues = BTreeMap<String, String>;

/// Association of template fields with dataset columns.
///
/// Each field maps to at most one column; one column may feed several fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<String, String>);

/// Lower-case and turn underscores into spaces
fn normalize(name: &str) -> String {
    name.to_lowercase().replace('_', " ")
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best-effort default mapping.
    ///
    /// A field takes the first column whose normalized name contains, or is
    /// contained in, the field's normalized name. Blank names never match.
    pub fn auto<F, C>(fields: &[F], columns: &[C]) -> Self
    where
        F: AsRef<str>,
        C: AsRef<str>,
    {
        let normalized_columns: Vec<String> =
            columns.iter().map(|c| normalize(c.as_ref())).collect();

        let mut mapping = BTreeMap::new();
        for field in fields {
            let field = field.as_ref();
            let wanted = normalize(field);
            if wanted.trim().is_empty() {
                continue;
            }

            let found = normalized_columns.iter().position(|candidate| {
                !candidate.trim().is_empty()
                    && (candidate.contains(&wanted) || wanted.contains(candidate.as_str()))
            });

            if let Some(i) = found {
                mapping.insert(field.to_string(), columns[i].as_ref().to_string());
            }
        }
        Self(mapping)
    }

    /// Manually map `field` to `column`, replacing any previous choice
    pub fn assign(&mut self, field: impl Into<String>, column: impl Into<String>) {
        self.0.insert(field.into(), column.into());
    }

    /// Leave `field` unmapped
    pub fn clear(&mut self, field: &str) {
        self.0.remove(field);
    }

    pub fn column_for(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Fields from `fields` that have no column
    pub fn unmapped<'a, F: AsRef<str>>(&self, fields: &'a [F]) -> Vec<&'a str> {
        fields
            .iter()
            .map(AsRef::as_ref)
            .filter(|f| !self.0.contains_key(*f))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, c)| (f.as_str(), c.as_str()))
    }

    /// Values for one row. Every field in `fields` is present; unmapped
    /// fields and columns missing from the row yield an empty string.
    pub fn payload<F: AsRef<str>>(&self, fields: &[F], row: &Row) -> FieldValues {
        fields
            .iter()
            .map(|field| {
                let field = field.as_ref();
                let value = self
                    .column_for(field)
                    .and_then(|column| row.get(column))
                    .cloned()
                    .unwrap_or_default();
                (field.to_string(), value)
            })
            .collect()
    }
}

impl FromIterator<(String, String)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_maps_by_normalized_name() {
        let mapping = FieldMapping::auto(&["client_name", "start_date"], &["Client Name", "Start Date"]);

        assert_eq!(mapping.column_for("client_name"), Some("Client Name"));
        assert_eq!(mapping.column_for("start_date"), Some("Start Date"));
    }

    #[test]
    fn test_substring_either_direction() {
        // column inside field
        let mapping = FieldMapping::auto(&["client_email"], &["email"]);
        assert_eq!(mapping.column_for("client_email"), Some("email"));

        // field inside column
        let mapping = FieldMapping::auto(&["value"], &["contract_value_usd"]);
        assert_eq!(mapping.column_for("value"), Some("contract_value_usd"));
    }

    #[test]
    fn test_every_underscore_is_replaced() {
        let mapping = FieldMapping::auto(&["contract_start_date"], &["Contract Start Date"]);
        assert_eq!(mapping.column_for("contract_start_date"), Some("Contract Start Date"));
    }

    #[test]
    fn test_first_matching_column_wins() {
        let mapping = FieldMapping::auto(&["client_name"], &["Name", "Client Name"]);
        assert_eq!(mapping.column_for("client_name"), Some("Name"));
    }

    #[test]
    fn test_unresolved_fields_are_left_unmapped() {
        let fields = ["client_name", "contract_value"];
        let mapping = FieldMapping::auto(&fields, &["Client"]);

        assert_eq!(mapping.column_for("contract_value"), None);
        assert_eq!(mapping.unmapped(&fields), vec!["contract_value"]);
    }

    #[test]
    fn test_blank_columns_never_match() {
        let mapping = FieldMapping::auto(&["client_name"], &["", "  ", "Client Name"]);
        assert_eq!(mapping.column_for("client_name"), Some("Client Name"));
    }

    #[test]
    fn test_column_reused_across_fields() {
        let mapping = FieldMapping::auto(&["client_name", "name"], &["Name"]);
        assert_eq!(mapping.column_for("client_name"), Some("Name"));
        assert_eq!(mapping.column_for("name"), Some("Name"));
    }

    #[test]
    fn test_overrides() {
        let mut mapping = FieldMapping::auto(&["client_name"], &["Client Name", "Customer"]);
        mapping.assign("client_name", "Customer");
        assert_eq!(mapping.column_for("client_name"), Some("Customer"));

        mapping.clear("client_name");
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_payload_fills_every_field() {
        let mut mapping = FieldMapping::new();
        mapping.assign("client_name", "Name");
        mapping.assign("end_date", "End");

        let values = mapping.payload(
            &["client_name", "end_date", "contract_value"],
            &row(&[("Name", "Acme")]),
        );

        assert_eq!(values["client_name"], "Acme");
        // mapped, but the row lacks the column
        assert_eq!(values["end_date"], "");
        // unmapped
        assert_eq!(values["contract_value"], "");
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut mapping = FieldMapping::new();
        mapping.assign("a", "A");
        assert_eq!(serde_json::to_string(&mapping).unwrap(), r#"{"a":"A"}"#);
    }

    proptest! {
        #[test]
        fn auto_mapping_is_deterministic(
            fields in prop::collection::vec("[a-z_]{0,12}", 0..8),
            columns in prop::collection::vec("[A-Za-z _]{0,12}", 0..8),
        ) {
            let first = FieldMapping::auto(&fields, &columns);
            let second = FieldMapping::auto(&fields, &columns);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn auto_mapping_only_uses_known_columns(
            fields in prop::collection::vec("[a-z_]{1,12}", 0..8),
            columns in prop::collection::vec("[A-Za-z _]{0,12}", 0..8),
        ) {
            let mapping = FieldMapping::auto(&fields, &columns);
            for (field, column) in mapping.iter() {
                prop_assert!(fields.iter().any(|f| f == field));
                prop_assert!(columns.iter().any(|c| c == column));
                let nf = normalize(field);
                let nc = normalize(column);
                prop_assert!(nf.contains(&nc) || nc.contains(&nf));
            }
        }
    }
}
