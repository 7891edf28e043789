// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document pipeline
//!
//! Reads a stream of YAML documents, applies the resolved rules to every
//! schema version each document carries, and writes the generated documents
//! followed by the rewritten original.

use std::collections::HashMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::{debug, info};

use crate::error::{Result, SemanticError};
use crate::rules::{version_root, ResolvedRules, RuleSet};
use crate::tree::{Node, Path, Tree};

/// Name used for the input stream in parse errors
const INPUT_SOURCE: &str = "input documents";

/// Separator written between output documents
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    /// Records decoded from the input stream
    pub documents_read: usize,
    /// Empty records that were passed over
    pub documents_skipped: usize,
    /// Documents written to the output, generated ones included
    pub documents_written: usize,
    /// Secrets generated by secret rules
    pub secrets_generated: usize,
}

/// Apply the rules read from `rules` to every document in `input`.
///
/// Stops at the first error. Output written before the error has already
/// reached `output`, so a failed run must not be treated as a complete
/// result.
pub fn apply<W: Write, R: Read, S: Read>(output: W, input: R, rules: S) -> Result<ApplySummary> {
    let rules = RuleSet::from_reader(rules)?;
    Pipeline::new(&rules).run(output, input)
}

/// Applies one rule set to any number of documents
pub struct Pipeline<'a> {
    rules: &'a RuleSet,
    resolved: HashMap<String, ResolvedRules<'a>>,
}

impl<'a> Pipeline<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            rules,
            resolved: HashMap::new(),
        }
    }

    /// Process every document from `input` and write the results to `output`
    pub fn run<W: Write, R: Read>(&mut self, output: W, input: R) -> Result<ApplySummary> {
        let mut writer = DocumentWriter::new(output);
        let mut summary = ApplySummary::default();

        for (index, record) in serde_yaml::Deserializer::from_reader(input).enumerate() {
            let value =
                Value::deserialize(record).map_err(|e| SemanticError::parse(INPUT_SOURCE, e))?;
            summary.documents_read += 1;

            // Top-level tags are dropped like nested ones
            let document = match Node::from_yaml(value)? {
                Node::Null => {
                    debug!(document = index, "Skipping empty document");
                    summary.documents_skipped += 1;
                    continue;
                }
                Node::Map(tree) => tree,
                other => {
                    return Err(SemanticError::parse(
                        INPUT_SOURCE,
                        format!("document #{} is not a map: {:?}", index, other),
                    ))
                }
            };

            let documents = self.process(document)?;
            summary.secrets_generated += documents.len() - 1;
            for document in &documents {
                writer.write(document)?;
            }
        }

        summary.documents_written = writer.finish()?;

        info!(
            read = summary.documents_read,
            written = summary.documents_written,
            secrets = summary.secrets_generated,
            "Applied semantic rules"
        );
        Ok(summary)
    }

    /// Apply the rules to one document.
    ///
    /// Returns the generated documents followed by the rewritten document.
    pub fn process(&mut self, mut document: Tree) -> Result<Vec<Tree>> {
        let kind = document
            .get_str(&Path::from(["kind"]))
            .ok_or_else(|| SemanticError::MissingField {
                field: "kind".to_string(),
                message: "every document needs a string kind".to_string(),
            })?
            .to_string();

        let rules = self.rules;
        let resolved = self
            .resolved
            .entry(kind.clone())
            .or_insert_with(|| rules.resolve_for(&kind));

        let mut output = Vec::new();
        for version in &rules.versions {
            if !document.contains(&version_root(version)) {
                debug!(kind = %kind, version = %version, "Version not present, skipping");
                continue;
            }

            for mapping in resolved.iter() {
                output.extend(mapping.apply(&mut document, version)?);
            }
        }

        debug!(kind = %kind, generated = output.len(), "Processed document");
        output.push(document);
        Ok(output)
    }
}

/// Writes a stream of YAML documents with a separator between each pair
pub struct DocumentWriter<W: Write> {
    inner: W,
    written: usize,
}

impl<W: Write> DocumentWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn write(&mut self, document: &Tree) -> Result<()> {
        if self.written > 0 {
            self.inner.write_all(DOCUMENT_SEPARATOR.as_bytes())?;
        }
        serde_yaml::to_writer(&mut self.inner, document)?;
        self.written += 1;
        Ok(())
    }

    /// Flush and report how many documents were written
    pub fn finish(mut self) -> Result<usize> {
        self.inner.flush()?;
        Ok(self.written)
    }
}
