// SPDX-License-Identifier: AGPL-3.0-or-later
//! semanticrd: semantic rules for Kubernetes-style custom resources
//!
//! Rewrites custom resource documents according to a declarative rule file
//! so that the role of individual fields becomes explicit.
//!
//! # Features
//!
//! * **Identifiers:** moves fields under `spec.<version>.identifier`
//! * **References:** moves fields under `spec.<version>.references`
//! * **Secrets:** extracts sensitive fields into a generated `Secret` and
//!   leaves its name behind
//!
//! Rules are applied to every schema version listed in the rule file, and
//! re-running them over their own output changes nothing.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod rules;
pub mod tree;

pub use config::Config;
pub use error::{Result, SemanticError};
pub use pipeline::{apply, ApplySummary, DocumentWriter, Pipeline};
pub use rules::{Mapping, RuleSet};
pub use tree::{Node, Path, Tree};
