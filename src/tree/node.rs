// SPDX-License-Identifier: AGPL-3.0-or-later
//! Ordered document trees and the field accessor operations on them

use indexmap::IndexMap;
use serde::Serialize;
use serde_yaml::Value;

use super::Path;
use crate::error::{Result, SemanticError};

/// A single value inside a document tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Bool(bool),
    /// Every integer that fits is stored as `i64`
    Int(i64),
    /// Integers above `i64::MAX`, passed through untouched
    UInt(u64),
    Float(f64),
    String(String),
    Sequence(Vec<Node>),
    Map(Tree),
}

/// A string-keyed map that keeps the insertion order of its keys
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Tree(IndexMap<String, Node>);

impl Node {
    /// Convert a decoded YAML value, normalizing numbers and map keys.
    ///
    /// Integers become `i64` regardless of how the decoder represented them,
    /// unless they only fit in `u64`.
    /// YAML tags are dropped and only the tagged value is kept.
    pub fn from_yaml(value: Value) -> Result<Self> {
        Ok(match value {
            Value::Null => Node::Null,
            Value::Bool(value) => Node::Bool(value),
            Value::Number(number) => sanitize_number(&number),
            Value::String(value) => Node::String(value),
            Value::Sequence(items) => Node::Sequence(
                items
                    .into_iter()
                    .map(Node::from_yaml)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Mapping(mapping) => Node::Map(Tree::from_mapping(mapping)?),
            Value::Tagged(tagged) => Node::from_yaml(tagged.value)?,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Node::Map(tree) => Some(tree),
            _ => None,
        }
    }
}

fn sanitize_number(number: &serde_yaml::Number) -> Node {
    if let Some(value) = number.as_i64() {
        Node::Int(value)
    } else if let Some(value) = number.as_u64() {
        Node::UInt(value)
    } else {
        // serde_yaml numbers are always one of i64, u64 or f64
        Node::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

fn render_key(key: Value) -> Result<String> {
    match key {
        Value::String(key) => Ok(key),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(value) => Ok(value.to_string()),
        Value::Null => Ok("null".to_string()),
        Value::Tagged(tagged) => render_key(tagged.value),
        other => Err(SemanticError::parse(
            "document",
            format!("unsupported map key {:?}", other),
        )),
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<i32> for Node {
    fn from(value: i32) -> Self {
        Node::Int(i64::from(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Int(value)
    }
}

impl From<Tree> for Node {
    fn from(tree: Tree) -> Self {
        Node::Map(tree)
    }
}

impl Tree {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Convert a decoded YAML mapping into a tree
    pub fn from_mapping(mapping: serde_yaml::Mapping) -> Result<Self> {
        let mut entries = IndexMap::with_capacity(mapping.len());
        for (key, value) in mapping {
            entries.insert(render_key(key)?, Node::from_yaml(value)?);
        }
        Ok(Self(entries))
    }

    /// Insert a top-level entry, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        self.0.insert(key.into(), value.into())
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Borrow the value at `path`.
    ///
    /// Returns `None` when any segment is missing or an intermediate value is
    /// not a map.
    pub fn get(&self, path: &Path) -> Option<&Node> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for segment in parents {
            match current.0.get(segment) {
                Some(Node::Map(child)) => current = child,
                _ => return None,
            }
        }
        current.0.get(last)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }

    /// Borrow the string at `path`, if there is one
    pub fn get_str(&self, path: &Path) -> Option<&str> {
        self.get(path).and_then(Node::as_str)
    }

    /// Write `value` at `path`, creating missing intermediate maps
    pub fn set(&mut self, path: &Path, value: impl Into<Node>) -> Result<()> {
        self.try_set(path, value.into()).map_err(|(err, _)| err)
    }

    /// Delete the value at `path`; absent paths are left alone
    pub fn remove(&mut self, path: &Path) -> Option<Node> {
        self.take(path).map(|(_, value)| value)
    }

    /// Move the value at `src` to `dst` within this tree.
    ///
    /// Returns `Ok(false)` without touching the tree when `src` is absent.
    pub fn relocate(&mut self, src: &Path, dst: &Path) -> Result<bool> {
        let Some((index, value)) = self.take(src) else {
            return Ok(false);
        };
        match self.try_set(dst, value) {
            Ok(()) => Ok(true),
            Err((err, value)) => {
                self.restore(src, index, value);
                Err(err)
            }
        }
    }

    /// Write without losing ownership of `value` on failure
    fn try_set(
        &mut self,
        path: &Path,
        value: Node,
    ) -> std::result::Result<(), (SemanticError, Node)> {
        let Some((last, parents)) = path.split_last() else {
            return Err((
                SemanticError::InvalidPath {
                    message: "cannot write at an empty path".to_string(),
                },
                value,
            ));
        };

        let mut current = self;
        for (depth, segment) in parents.iter().enumerate() {
            let entry = current
                .0
                .entry(segment.clone())
                .or_insert_with(|| Node::Map(Tree::new()));
            match entry {
                Node::Map(child) => current = child,
                _ => {
                    let conflict = Path::from(parents[..=depth].to_vec());
                    return Err((
                        SemanticError::WriteConflict {
                            path: path.to_string(),
                            conflict: conflict.to_string(),
                        },
                        value,
                    ));
                }
            }
        }

        current.0.insert(last.clone(), value);
        Ok(())
    }

    /// Remove the value at `path` along with its position in the parent map
    fn take(&mut self, path: &Path) -> Option<(usize, Node)> {
        let (last, parents) = path.split_last()?;
        let parent = self.parent_mut(parents)?;
        parent
            .0
            .shift_remove_full(last)
            .map(|(index, _, value)| (index, value))
    }

    /// Put back a value removed by `take`
    fn restore(&mut self, path: &Path, index: usize, value: Node) {
        if let Some((last, parents)) = path.split_last() {
            if let Some(parent) = self.parent_mut(parents) {
                let index = index.min(parent.0.len());
                parent.0.shift_insert(index, last.clone(), value);
            }
        }
    }

    fn parent_mut(&mut self, parents: &[String]) -> Option<&mut Tree> {
        let mut current = self;
        for segment in parents {
            match current.0.get_mut(segment) {
                Some(Node::Map(child)) => current = child,
                _ => return None,
            }
        }
        Some(current)
    }
}

/// Move the value at `src_path` in `src` to `dst_path` in `dst`.
///
/// A missing source is a successful no-op, which is what makes re-applying
/// rules to already processed documents harmless. If the write fails the
/// source keeps its value.
pub fn move_field(
    src: &mut Tree,
    dst: &mut Tree,
    src_path: &Path,
    dst_path: &Path,
) -> Result<bool> {
    let Some((index, value)) = src.take(src_path) else {
        return Ok(false);
    };
    match dst.try_set(dst_path, value) {
        Ok(()) => Ok(true),
        Err((err, value)) => {
            src.restore(src_path, index, value);
            Err(err)
        }
    }
}
