// SPDX-License-Identifier: AGPL-3.0-or-later
//! Semantic rule loading, resolution, and application
//!
//! A rule file lists global rules for every document kind plus per-kind
//! overrides. Each rule moves fields within a schema version to mark them as
//! an identifier or a reference, or extracts them into a generated secret.

mod mapping;
mod parser;
mod resolver;

pub use mapping::{
    version_root, IdRule, Mapping, RefRule, SecretField, SecretRule, IDENTIFIER_NAMESPACE,
    ID_TAG, REFERENCES_NAMESPACE, REFERENCE_TAG, SECRET_NAME_SUFFIX, SECRET_TAG,
};
pub use parser::RuleSet;
pub use resolver::{resolve, ResolvedRules};

use std::path::Path;

use crate::error::Result;

/// Load and validate a rule file
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<RuleSet> {
    RuleSet::from_file(path)
}
