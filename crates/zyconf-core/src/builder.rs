//! Tree construction
//!
//! Converts a nested mapping (`section -> subsection -> option -> value`)
//! into a linked [`Tree`] in one depth-first pass. Children are built
//! first, then their parent node, then each child's parent link is set.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::interpolation::Interpolate;
use crate::node::{ConfigLevel, NodeData, NodeId, Slot, Tree, MAX_CONFIG_LEVEL};
use crate::value::Value;

/// Builds a [`Tree`] from a nested mapping
pub struct TreeBuilder {
    interpolation: Arc<dyn Interpolate>,
    nodes: Vec<NodeData>,
}

impl TreeBuilder {
    /// Create a builder whose tree will use `interpolation`
    pub fn new(interpolation: Arc<dyn Interpolate>) -> Self {
        Self {
            interpolation,
            nodes: Vec::new(),
        }
    }

    /// Build a tree whose root sits at `depth` (normally 0)
    ///
    /// `header` labels the root in error messages. No partial tree is
    /// returned on error.
    pub fn build(mut self, mapping: &IndexMap<String, Value>, header: &str, depth: usize) -> Result<Tree> {
        let root = self.build_node(mapping, header, &[], depth)?;
        self.nodes[root.index()].set_parent(None)?;

        log::debug!(
            "built config tree '{}' with {} nodes",
            header,
            self.nodes.len()
        );
        Ok(Tree::new(self.nodes, root, self.interpolation))
    }

    fn build_node(
        &mut self,
        mapping: &IndexMap<String, Value>,
        header: &str,
        path: &[&str],
        depth: usize,
    ) -> Result<NodeId> {
        if depth >= MAX_CONFIG_LEVEL {
            let full_header = if path.is_empty() {
                header.to_string()
            } else {
                path.join(".")
            };
            return Err(Error::max_level_exceeded(full_header, MAX_CONFIG_LEVEL));
        }

        let level = ConfigLevel::from_depth(depth);
        let mut data = NodeData::new(level);
        let mut children = Vec::new();

        for (key, value) in mapping {
            let mut child_path = path.to_vec();
            child_path.push(key);

            let slot = match value {
                Value::Mapping(inner) => {
                    let id = self.build_node(inner, key, &child_path, depth + 1)?;
                    children.push(id);
                    Slot::Node(id)
                }
                other => Slot::Value(self.interpolation.before_set(other.clone())),
            };

            if let Err(existing) = data.insert(key, slot) {
                let existing = self.describe(existing);
                return Err(Error::duplicate_key(level, child_path.join("."), existing));
            }
        }

        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        for child in children {
            self.nodes[child.index()].set_parent(Some(id))?;
        }
        Ok(id)
    }

    fn describe(&self, slot: &Slot) -> String {
        match slot {
            Slot::Node(id) => {
                let keys: Vec<&str> = self.nodes[id.index()].keys().collect();
                format!("{{{}}}", keys.join(", "))
            }
            Slot::Value(Value::String(s)) => format!("{:?}", s),
            Slot::Value(value) => value.to_literal(),
        }
    }
}
