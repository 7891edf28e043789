// SPDX-License-Identifier: AGPL-3.0-or-later
//! Semantic rule file parser
//!
//! The rule file is YAML. Each rule carries a `type` tag and a block named
//! after it:
//!
//! ```yaml
//! group: atlas.generated.mongodb.com
//! versions: [v20231115]
//! globals:
//!   - type: ID
//!     id: {path: ".id"}
//! overrides:
//!   AtlasThirdPartyIntegration:
//!     - type: SECRET
//!       secret:
//!         name: credentialsSecret
//!         fields:
//!           - path: ".licenseKey"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use super::mapping::{IdRule, Mapping, RefRule, SecretRule, ID_TAG, REFERENCE_TAG, SECRET_TAG};
use crate::error::{Result, SemanticError};

/// Name used for the rules stream in parse errors
const RULES_SOURCE: &str = "semantic rules";

/// The complete set of rules for one batch of documents
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleSet {
    /// API group the rules were written for
    pub group: String,

    /// Schema versions to visit under `spec`, in order
    pub versions: Vec<String>,

    /// Rules applied to every document kind
    pub globals: Vec<Mapping>,

    /// Extra rules per document kind; these win over globals with the same key
    pub overrides: IndexMap<String, Vec<Mapping>>,
}

/// On-disk shape of a rule set, before rule tags are checked
#[derive(Debug, Deserialize)]
struct RawRuleSet {
    #[serde(default)]
    group: String,

    #[serde(default)]
    versions: Vec<String>,

    #[serde(default)]
    globals: Vec<RawMapping>,

    #[serde(default)]
    overrides: IndexMap<String, Vec<RawMapping>>,
}

/// On-disk shape of one rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct RawMapping {
    #[serde(rename = "type")]
    pub(crate) rule_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<IdRule>,

    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub(crate) reference: Option<RefRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) secret: Option<SecretRule>,
}

impl TryFrom<RawMapping> for Mapping {
    type Error = SemanticError;

    fn try_from(raw: RawMapping) -> Result<Self> {
        let RawMapping {
            rule_type,
            id,
            reference,
            secret,
        } = raw;
        let missing = |block: &str| SemanticError::InvalidRule {
            rule: rule_type.clone(),
            message: format!("missing '{}' block", block),
        };

        match rule_type.as_str() {
            ID_TAG => id.map(Mapping::Identifier).ok_or_else(|| missing("id")),
            REFERENCE_TAG => reference
                .map(Mapping::Reference)
                .ok_or_else(|| missing("ref")),
            SECRET_TAG => secret.map(Mapping::Secret).ok_or_else(|| missing("secret")),
            other => Err(SemanticError::UnsupportedRuleType {
                rule_type: other.to_string(),
            }),
        }
    }
}

impl From<Mapping> for RawMapping {
    fn from(mapping: Mapping) -> Self {
        let rule_type = mapping.tag().to_string();
        let (id, reference, secret) = match mapping {
            Mapping::Identifier(rule) => (Some(rule), None, None),
            Mapping::Reference(rule) => (None, Some(rule), None),
            Mapping::Secret(rule) => (None, None, Some(rule)),
        };
        RawMapping {
            rule_type,
            id,
            reference,
            secret,
        }
    }
}

fn convert_all(raw: Vec<RawMapping>) -> Result<Vec<Mapping>> {
    raw.into_iter().map(Mapping::try_from).collect()
}

impl RuleSet {
    /// Load a rule set from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SemanticError::RulesNotFound {
                path: path.display().to_string(),
            });
        }

        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Decode and validate a rule set from a YAML stream
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: RawRuleSet = serde_yaml::from_reader(reader)
            .map_err(|e| SemanticError::parse(RULES_SOURCE, e))?;
        Self::from_raw(raw)
    }

    /// Decode and validate a rule set from a YAML string
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let raw: RawRuleSet =
            serde_yaml::from_str(contents).map_err(|e| SemanticError::parse(RULES_SOURCE, e))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawRuleSet) -> Result<Self> {
        let mut overrides = IndexMap::with_capacity(raw.overrides.len());
        for (kind, mappings) in raw.overrides {
            overrides.insert(kind, convert_all(mappings)?);
        }

        let rules = RuleSet {
            group: raw.group,
            versions: raw.versions,
            globals: convert_all(raw.globals)?,
            overrides,
        };
        rules.validate()?;

        debug!(
            group = %rules.group,
            versions = rules.versions.len(),
            globals = rules.globals.len(),
            overrides = rules.overrides.len(),
            "Loaded semantic rules"
        );
        Ok(rules)
    }

    /// Check every rule for empty paths and names.
    ///
    /// Rule sets that can never match anything (no versions) are only
    /// reported, not rejected.
    pub fn validate(&self) -> Result<()> {
        if self.versions.is_empty() {
            warn!(group = %self.group, "Rule set declares no versions; no document will change");
        }

        for (index, version) in self.versions.iter().enumerate() {
            if version.is_empty() {
                return Err(SemanticError::InvalidRule {
                    rule: "versions".to_string(),
                    message: format!("version #{} is empty", index),
                });
            }
            if self.versions[..index].contains(version) {
                warn!(version = %version, "Version listed more than once");
            }
        }

        for mapping in self.all_mappings() {
            mapping.validate()?;
        }

        Ok(())
    }

    /// Total number of rules, globals and overrides together
    pub fn rule_count(&self) -> usize {
        self.globals.len() + self.overrides.values().map(Vec::len).sum::<usize>()
    }

    fn all_mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.globals.iter().chain(self.overrides.values().flatten())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const SAMPLE_RULES: &str = r#"
group: atlas.generated.mongodb.com
versions:
  - v20231115
  - v20241113
globals:
  - type: ID
    id:
      path: ".id"
  - type: REFERENCE
    ref:
      path: ".groupId"
      parentKind: group
overrides:
  AtlasThirdPartyIntegration:
    - type: SECRET
      secret:
        name: "credentialsSecret"
        fields:
        - path: ".licenseKey"
        - path: ".readToken"
          rename: "read"
"#;

    #[test]
    fn test_parse_sample_rules() {
        let rules = RuleSet::from_yaml_str(SAMPLE_RULES).unwrap();
        assert_eq!(rules.group, "atlas.generated.mongodb.com");
        assert_eq!(rules.versions, vec!["v20231115", "v20241113"]);
        assert_eq!(rules.globals.len(), 2);
        assert_eq!(rules.rule_count(), 3);

        match &rules.globals[1] {
            Mapping::Reference(rule) => {
                assert_eq!(rule.path, ".groupId");
                assert_eq!(rule.parent_kind, "group");
            }
            other => panic!("Expected Reference rule, got {:?}", other),
        }

        match &rules.overrides["AtlasThirdPartyIntegration"][0] {
            Mapping::Secret(rule) => {
                assert_eq!(rule.name, "credentialsSecret");
                assert_eq!(rule.fields.len(), 2);
                assert_eq!(rule.fields[0].rename, None);
                assert_eq!(rule.fields[1].rename.as_deref(), Some("read"));
            }
            other => panic!("Expected Secret rule, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_sections_default_to_empty() {
        let rules = RuleSet::from_yaml_str("group: g\nversions: [v1]\n").unwrap();
        assert!(rules.globals.is_empty());
        assert!(rules.overrides.is_empty());
    }

    #[test]
    fn test_unknown_rule_type_is_rejected_at_load() {
        let contents = r#"
versions: [v1]
globals:
  - type: LABEL
    id: {path: ".id"}
"#;
        match RuleSet::from_yaml_str(contents) {
            Err(SemanticError::UnsupportedRuleType { rule_type }) => assert_eq!(rule_type, "LABEL"),
            other => panic!("Expected UnsupportedRuleType, got {:?}", other),
        }
    }

    #[test]
    fn test_rule_without_its_block_is_invalid() {
        let contents = r#"
versions: [v1]
globals:
  - type: REFERENCE
    id: {path: ".id"}
"#;
        assert!(matches!(
            RuleSet::from_yaml_str(contents),
            Err(SemanticError::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_empty_path_is_invalid() {
        let contents = r#"
versions: [v1]
globals:
  - type: ID
    id: {path: ""}
"#;
        assert!(matches!(
            RuleSet::from_yaml_str(contents),
            Err(SemanticError::InvalidRule { .. })
        ));
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let err = RuleSet::from_yaml_str("versions: [v1\n").unwrap_err();
        assert!(matches!(err, SemanticError::ParseError { .. }));
        assert!(err.to_string().contains("semantic rules"));
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("semantics.yaml");
        fs::write(&file_path, SAMPLE_RULES).unwrap();

        let rules = RuleSet::from_file(&file_path).unwrap();
        assert_eq!(rules.versions.len(), 2);

        assert!(matches!(
            RuleSet::from_file(temp_dir.path().join("missing.yaml")),
            Err(SemanticError::RulesNotFound { .. })
        ));
    }

    #[test]
    fn test_mapping_serializes_in_rule_file_shape() {
        let rules = RuleSet::from_yaml_str(SAMPLE_RULES).unwrap();
        let json = serde_json::to_value(&rules.globals[1]).unwrap();
        assert_eq!(json["type"], "REFERENCE");
        assert_eq!(json["ref"]["path"], ".groupId");
        assert_eq!(json["ref"]["parentKind"], "group");
        assert!(json.get("id").is_none());
    }
}
