//! Run configuration.
//!
//! A [`RunConfig`] carries everything the pipeline needs besides the input
//! bytes: the reference protein and concentration, the sample groups, the
//! layout of the instrument export, and output toggles. It is usually read
//! from a JSON file:
//!
//! ```json
//! {
//!   "referenceConcentration": 8,
//!   "groups": [
//!     { "name": "Control", "columns": "1,2,3" },
//!     { "name": "Treated", "columns": "4,5,6" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult, GroupResult, GroupSpecError};
use crate::models::Group;
use crate::transform::sheets::check_sheet_names;
use crate::validation::validate_run_config;

/// Concentration the reference protein is scaled to.
pub const DEFAULT_REFERENCE_CONCENTRATION: f64 = 8.0;

/// Identity label of the reference protein row.
pub const DEFAULT_REFERENCE_KEY: &str = "bsa";

/// Output name used when no pattern is configured.
pub const DEFAULT_FILE_NAME_PATTERN: &str = "{name}_normalized";

/// Layout of the instrument export.
///
/// The defaults describe the plate reader export this tool was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceLayout {
    /// Leading identity columns kept from the export's header line
    /// (protein id plus auxiliary columns).
    pub identity_columns: usize,

    /// Body row holding the per-sample labels.
    pub label_row: usize,

    /// Boilerplate body rows dropped before the data starts.
    pub skip_rows: usize,
}

impl Default for SourceLayout {
    fn default() -> Self {
        Self {
            identity_columns: 3,
            label_row: 1,
            skip_rows: 12,
        }
    }
}

/// A group as written in configuration: `columns` is a comma-separated list
/// of 1-based sample indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub name: String,
    pub columns: String,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>, columns: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into(),
        }
    }

    /// Parse into a [`Group`].
    ///
    /// Blank entries are ignored (`"1, 2,"` is two columns). Anything that is
    /// not a positive integer is rejected.
    pub fn parse(&self) -> GroupResult<Group> {
        let invalid = |message: String| GroupSpecError::InvalidGroupSpec {
            group: self.name.clone(),
            message,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("group name is empty".to_string()));
        }

        let mut columns = Vec::new();
        for entry in self.columns.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let column: usize = entry
                .parse()
                .map_err(|_| invalid(format!("'{}' is not an integer", entry)))?;
            if column == 0 {
                return Err(invalid("column indices start at 1".to_string()));
            }
            columns.push(column);
        }

        if columns.is_empty() {
            return Err(invalid("no columns listed".to_string()));
        }

        Ok(Group::new(self.name.trim(), columns))
    }
}

/// Full configuration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfig {
    /// Concentration the reference protein is scaled to.
    #[serde(default = "default_reference_concentration")]
    pub reference_concentration: f64,

    /// Identity label of the reference row, compared case-insensitively.
    #[serde(default = "default_reference_key")]
    pub reference_key: String,

    /// Sample groups, one sheet each, in output order.
    #[serde(default)]
    pub groups: Vec<GroupSpec>,

    /// Layout of the instrument export.
    #[serde(default)]
    pub layout: SourceLayout,

    /// Fail on proteins without positive values and on non-finite results.
    #[serde(default = "default_true")]
    pub strict: bool,

    /// Add AVG and SD columns to group sheets.
    #[serde(default = "default_true")]
    pub summary_statistics: bool,

    /// Output file name pattern; `{name}` is the input file stem and
    /// `{date}` the run date.
    #[serde(default = "default_file_name_pattern")]
    pub file_name_pattern: String,
}

fn default_reference_concentration() -> f64 {
    DEFAULT_REFERENCE_CONCENTRATION
}

fn default_reference_key() -> String {
    DEFAULT_REFERENCE_KEY.to_string()
}

fn default_file_name_pattern() -> String {
    DEFAULT_FILE_NAME_PATTERN.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            reference_concentration: DEFAULT_REFERENCE_CONCENTRATION,
            reference_key: default_reference_key(),
            groups: Vec::new(),
            layout: SourceLayout::default(),
            strict: true,
            summary_statistics: true,
            file_name_pattern: default_file_name_pattern(),
        }
    }
}

impl RunConfig {
    /// Parse a configuration from a JSON string, checking it against the
    /// embedded schema first.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a configuration from a JSON value.
    pub fn from_value(value: &Value) -> ConfigResult<Self> {
        validate_run_config(value).map_err(ConfigError::Schema)?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse every group spec, stopping at the first invalid one, and make
    /// sure every group gets a sheet name of its own.
    pub fn parsed_groups(&self) -> GroupResult<Vec<Group>> {
        let groups = self
            .groups
            .iter()
            .map(GroupSpec::parse)
            .collect::<GroupResult<Vec<_>>>()?;
        check_sheet_names(&groups)?;
        Ok(groups)
    }
}

/// Expand an output file name pattern.
///
/// `{name}` becomes the input stem and `{date}` the caller-supplied date;
/// `.xlsx` is appended when missing.
pub fn output_file_name(pattern: &str, input_stem: &str, date: &str) -> String {
    let pattern = if pattern.trim().is_empty() {
        DEFAULT_FILE_NAME_PATTERN
    } else {
        pattern
    };
    let name = pattern.replace("{name}", input_stem).replace("{date}", date);
    if name.to_lowercase().ends_with(".xlsx") {
        name
    } else {
        format!("{}.xlsx", name)
    }
}

/// Generate an example configuration for documentation
pub fn example_config() -> RunConfig {
    RunConfig {
        groups: vec![
            GroupSpec::new("Control", "1,2,3"),
            GroupSpec::new("Treated", "4,5,6"),
        ],
        ..RunConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config = RunConfig::from_json(r#"{ "groups": [] }"#).unwrap();
        assert_eq!(config.reference_concentration, 8.0);
        assert_eq!(config.reference_key, "bsa");
        assert_eq!(config.layout, SourceLayout::default());
        assert!(config.strict);
        assert!(config.summary_statistics);
    }

    #[test]
    fn test_camel_case_fields() {
        let config = RunConfig::from_json(
            r#"{
                "referenceConcentration": 2.5,
                "groups": [{ "name": "G", "columns": "2,3" }],
                "layout": { "skipRows": 4 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.reference_concentration, 2.5);
        assert_eq!(config.groups[0].name, "G");
        assert_eq!(config.layout.skip_rows, 4);
        assert_eq!(config.layout.label_row, 1);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = example_config();
        let parsed = RunConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_schema_rejects_bad_types() {
        let result = RunConfig::from_json(r#"{ "referenceConcentration": "eight" }"#);
        assert!(matches!(result, Err(ConfigError::Schema(_))));
    }

    #[test]
    fn test_group_spec_parse() {
        let group = GroupSpec::new("Control", " 3, 1 ,2,").parse().unwrap();
        assert_eq!(group.name, "Control");
        assert_eq!(group.columns, vec![3, 1, 2]);
    }

    #[test]
    fn test_group_spec_rejects_non_integers() {
        let err = GroupSpec::new("Control", "1,two").parse().unwrap_err();
        assert!(matches!(err, GroupSpecError::InvalidGroupSpec { .. }));
        assert!(err.to_string().contains("'two'"));

        assert!(GroupSpec::new("Control", "1.5").parse().is_err());
        assert!(GroupSpec::new("Control", "0").parse().is_err());
        assert!(GroupSpec::new("Control", " , ").parse().is_err());
        assert!(GroupSpec::new("  ", "1").parse().is_err());
    }

    #[test]
    fn test_parsed_groups_rejects_sheet_name_clash() {
        let config = RunConfig {
            groups: vec![GroupSpec::new("Control", "1"), GroupSpec::new("control", "2")],
            ..RunConfig::default()
        };
        assert!(matches!(
            config.parsed_groups(),
            Err(GroupSpecError::DuplicateSheetName { .. })
        ));
        assert_eq!(example_config().parsed_groups().unwrap().len(), 2);
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name("{name}_normalized", "plate1", "2024-03-01"),
            "plate1_normalized.xlsx"
        );
        assert_eq!(
            output_file_name("{date}-{name}.xlsx", "plate1", "2024-03-01"),
            "2024-03-01-plate1.xlsx"
        );
        assert_eq!(output_file_name("", "plate1", "x"), "plate1_normalized.xlsx");
    }
}
