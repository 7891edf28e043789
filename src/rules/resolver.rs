// SPDX-License-Identifier: AGPL-3.0-or-later
//! Per-kind rule resolution

use indexmap::IndexMap;

use super::mapping::Mapping;
use super::parser::RuleSet;

/// The rules that apply to one document kind, de-duplicated by unique key
#[derive(Debug, Clone, Default)]
pub struct ResolvedRules<'a> {
    mappings: IndexMap<String, &'a Mapping>,
}

/// Merge `globals` and the overrides for `kind`.
///
/// Rules are inserted globals first, so an override sharing a unique key with
/// a global replaces it. A later rule with the same key also replaces an
/// earlier one within the same list.
pub fn resolve<'a>(
    globals: &'a [Mapping],
    overrides: &'a IndexMap<String, Vec<Mapping>>,
    kind: &str,
) -> ResolvedRules<'a> {
    let kind_rules = overrides.get(kind).map(Vec::as_slice).unwrap_or_default();

    let mut mappings = IndexMap::with_capacity(globals.len() + kind_rules.len());
    for mapping in globals.iter().chain(kind_rules) {
        mappings.insert(mapping.unique_key(), mapping);
    }
    ResolvedRules { mappings }
}

impl RuleSet {
    /// Rules to apply to documents of `kind`
    pub fn resolve_for(&self, kind: &str) -> ResolvedRules<'_> {
        resolve(&self.globals, &self.overrides, kind)
    }
}

impl<'a> ResolvedRules<'a> {
    /// Resolved rules. Callers must not rely on the order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Mapping> + '_ {
        self.mappings.values().copied()
    }

    #[cfg(test)]
    fn get(&self, unique_key: &str) -> Option<&'a Mapping> {
        self.mappings.get(unique_key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{IdRule, RefRule, SecretField, SecretRule};

    fn id(path: &str) -> Mapping {
        Mapping::Identifier(IdRule { path: path.to_string() })
    }

    fn reference(path: &str, parent_kind: &str) -> Mapping {
        Mapping::Reference(RefRule {
            path: path.to_string(),
            parent_kind: parent_kind.to_string(),
        })
    }

    fn rules() -> RuleSet {
        let mut overrides = IndexMap::new();
        overrides.insert(
            "AtlasDatabaseUser".to_string(),
            vec![reference(".groupId", "project"), id(".username")],
        );
        overrides.insert(
            "AtlasThirdPartyIntegration".to_string(),
            vec![Mapping::Secret(SecretRule {
                name: "credentialsSecret".to_string(),
                fields: vec![SecretField {
                    path: ".licenseKey".to_string(),
                    rename: None,
                }],
            })],
        );
        RuleSet {
            group: "atlas.generated.mongodb.com".to_string(),
            versions: vec!["v1".to_string()],
            globals: vec![id(".id"), reference(".groupId", "group")],
            overrides,
        }
    }

    #[test]
    fn test_unknown_kind_gets_globals() {
        let rules = rules();
        let resolved = rules.resolve_for("AtlasProject");
        assert_eq!(resolved.len(), 2);
        assert!(resolved.get("ID/.id").is_some());
        assert!(resolved.get("REFERENCE/.groupId").is_some());
    }

    #[test]
    fn test_override_wins_key_collision() {
        let rules = rules();
        let resolved = rules.resolve_for("AtlasDatabaseUser");
        assert_eq!(resolved.len(), 3);

        match resolved.get("REFERENCE/.groupId") {
            Some(Mapping::Reference(rule)) => assert_eq!(rule.parent_kind, "project"),
            other => panic!("Expected overriding Reference rule, got {:?}", other),
        }
        assert!(resolved.get("ID/.username").is_some());
    }

    #[test]
    fn test_overrides_are_scoped_to_their_kind() {
        let rules = rules();
        let resolved = rules.resolve_for("AtlasThirdPartyIntegration");
        assert_eq!(resolved.len(), 3);
        assert!(resolved.get("SECRET/credentialsSecret").is_some());
        assert!(rules.resolve_for("AtlasDatabaseUser").get("SECRET/credentialsSecret").is_none());
    }

    #[test]
    fn test_resolve_empty_rule_set() {
        let rules = RuleSet::default();
        let resolved = rules.resolve_for("Anything");
        assert!(resolved.is_empty());
        assert_eq!(resolved.iter().count(), 0);
    }

    #[test]
    fn test_duplicate_globals_collapse() {
        let globals = vec![reference(".groupId", "a"), reference(".groupId", "b")];
        let overrides = IndexMap::new();
        let resolved = resolve(&globals, &overrides, "Kind");
        assert_eq!(resolved.keys().collect::<Vec<_>>(), vec!["REFERENCE/.groupId"]);
        match resolved.iter().next() {
            Some(Mapping::Reference(rule)) => assert_eq!(rule.parent_kind, "b"),
            other => panic!("Expected Reference rule, got {:?}", other),
        };
    }
}
