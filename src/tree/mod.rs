// SPDX-License-Identifier: AGPL-3.0-or-later
//! Document trees and dotted paths into them
//!
//! Documents are decoded from YAML into [`Tree`], an insertion-ordered map of
//! [`Node`] values, so that re-encoded output keeps the key order of the
//! input. All reads and writes go through [`Path`].

mod node;
mod path;

pub use node::{move_field, Node, Tree};
pub use path::Path;
