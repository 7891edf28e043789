// SPDX-License-Identifier: AGPL-3.0-or-later
//! Rule variants and how each one rewrites a document
//!
//! All rule paths are relative to the root of one schema version, that is
//! `spec.<version>`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::parser::RawMapping;
use crate::error::{Result, SemanticError};
use crate::tree::{move_field, Path, Tree};

/// Tag for identifier rules
pub const ID_TAG: &str = "ID";
/// Tag for reference rules
pub const REFERENCE_TAG: &str = "REFERENCE";
/// Tag for secret extraction rules
pub const SECRET_TAG: &str = "SECRET";

/// Namespace identifier fields are moved under
pub const IDENTIFIER_NAMESPACE: &str = "identifier";
/// Namespace reference fields are moved under
pub const REFERENCES_NAMESPACE: &str = "references";

/// Appended to `metadata.name` to name a generated secret
pub const SECRET_NAME_SUFFIX: &str = "-secret";

/// A single semantic rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "RawMapping")]
pub enum Mapping {
    /// Marks a field as the document's identifier
    Identifier(IdRule),
    /// Marks a field as pointing at another resource
    Reference(RefRule),
    /// Pulls sensitive fields out into a generated `Secret`
    Secret(SecretRule),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdRule {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefRule {
    pub path: String,

    /// Kind of the referenced resource. Carried along, not checked.
    #[serde(rename = "parentKind", default)]
    pub parent_kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRule {
    /// Field that receives the generated secret's name
    pub name: String,

    /// Fields moved into the secret's `data`
    #[serde(default)]
    pub fields: Vec<SecretField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretField {
    pub path: String,

    /// Key under `data` to use instead of `path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
}

/// `spec.<version>`
pub fn version_root(version: &str) -> Path {
    Path::from(["spec", version])
}

impl Mapping {
    pub fn tag(&self) -> &'static str {
        match self {
            Mapping::Identifier(_) => ID_TAG,
            Mapping::Reference(_) => REFERENCE_TAG,
            Mapping::Secret(_) => SECRET_TAG,
        }
    }

    /// Identity used to de-duplicate rules, e.g. `ID/.id` or
    /// `SECRET/credentialsSecret`
    pub fn unique_key(&self) -> String {
        let subject = match self {
            Mapping::Identifier(rule) => &rule.path,
            Mapping::Reference(rule) => &rule.path,
            Mapping::Secret(rule) => &rule.name,
        };
        format!("{}/{}", self.tag(), subject)
    }

    /// Rewrite `document` for one schema version.
    ///
    /// Returns the documents generated as a side effect, which is at most one
    /// secret.
    pub fn apply(&self, document: &mut Tree, version: &str) -> Result<Vec<Tree>> {
        let outcome: Result<Vec<Tree>> = match self {
            Mapping::Identifier(rule) => {
                relocate_into(document, version, &rule.path, IDENTIFIER_NAMESPACE)
                    .map(|_| Vec::new())
            }
            Mapping::Reference(rule) => {
                relocate_into(document, version, &rule.path, REFERENCES_NAMESPACE)
                    .map(|_| Vec::new())
            }
            Mapping::Secret(rule) => rule
                .extract(document, version)
                .map(|secret| secret.into_iter().collect()),
        };

        outcome.map_err(|source| SemanticError::RuleFailed {
            rule: self.unique_key(),
            version: version.to_string(),
            source: Box::new(source),
        })
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> Result<()> {
            Err(SemanticError::InvalidRule {
                rule: self.unique_key(),
                message: message.to_string(),
            })
        };

        match self {
            Mapping::Identifier(IdRule { path }) | Mapping::Reference(RefRule { path, .. }) => {
                if path.is_empty() {
                    return invalid("path cannot be empty");
                }
            }
            Mapping::Secret(rule) => {
                if rule.name.is_empty() {
                    return invalid("secret field name cannot be empty");
                }
                if rule.fields.is_empty() {
                    return invalid("secret declares no fields");
                }
                for field in &rule.fields {
                    if field.path.is_empty() {
                        return invalid("secret field path cannot be empty");
                    }
                    if field.rename.as_deref() == Some("") {
                        return invalid("secret field rename cannot be empty");
                    }
                }
            }
        }
        Ok(())
    }
}

/// Move `spec.<version>.<path>` to `spec.<version>.<namespace>.<path>`
fn relocate_into(document: &mut Tree, version: &str, path: &str, namespace: &str) -> Result<bool> {
    let root = version_root(version);
    let field = Path::parse(path);
    let src = root.join(&field);
    let dst = root.child(namespace).join(&field);

    let moved = document.relocate(&src, &dst)?;
    if moved {
        debug!(from = %src, to = %dst, "Relocated field");
    }
    Ok(moved)
}

impl SecretRule {
    /// Move the configured fields into a new `Secret` document.
    ///
    /// Nothing happens unless every field is present in this version.
    fn extract(&self, document: &mut Tree, version: &str) -> Result<Option<Tree>> {
        let name = document
            .get_str(&Path::from(["metadata", "name"]))
            .ok_or_else(|| SemanticError::MissingField {
                field: "metadata.name".to_string(),
                message: "required to name the generated secret".to_string(),
            })?;
        let secret_name = format!("{}{}", name, SECRET_NAME_SUFFIX);

        let root = version_root(version);
        let sources: Vec<Path> = self
            .fields
            .iter()
            .map(|field| root.join(&Path::parse(&field.path)))
            .collect();

        if let Some(missing) = sources.iter().find(|source| !document.contains(source)) {
            debug!(
                secret = %self.name,
                missing = %missing,
                "Skipping secret extraction, not every field is present"
            );
            return Ok(None);
        }

        let mut metadata = Tree::new();
        metadata.insert("name", secret_name.as_str());
        let mut secret = Tree::new();
        secret.insert("apiVersion", "v1");
        secret.insert("kind", "Secret");
        secret.insert("metadata", metadata);

        for (field, source) in self.fields.iter().zip(&sources) {
            let key = field.rename.as_deref().unwrap_or(&field.path);
            let target = Path::from(["data"]).join(&Path::parse(key));
            move_field(document, &mut secret, source, &target)?;
        }

        document.set(&root.join(&Path::parse(&self.name)), secret_name.as_str())?;

        debug!(secret = %secret_name, fields = self.fields.len(), "Extracted secret");
        Ok(Some(secret))
    }
}
