//! Config nodes
//!
//! A built configuration is an arena of nodes addressed by [`NodeId`].
//! Each node stores its entries (child nodes or option values) and the id
//! of its parent, so paths can be reconstructed without reference cycles.
//!
//! The level of a node names what its keys are: the root holds sections,
//! a section node holds subsections and a subsection node holds options.
//! Only values held by an OPTION-level node are interpolated on read.

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::interpolation::Interpolate;
use crate::value::Value;

/// Maximum number of levels (section, subsection, option)
pub const MAX_CONFIG_LEVEL: usize = 3;

/// Position of a node in the hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigLevel {
    /// Keys are section names (the root)
    Section,
    /// Keys are subsection names
    Subsection,
    /// Keys are option names
    Option,
    /// Node built outside of the three known levels
    Unknown,
}

impl ConfigLevel {
    /// Level of a node built at `depth` below the root
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 => ConfigLevel::Section,
            1 => ConfigLevel::Subsection,
            2 => ConfigLevel::Option,
            _ => ConfigLevel::Unknown,
        }
    }
}

impl fmt::Display for ConfigLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigLevel::Section => "section",
            ConfigLevel::Subsection => "subsection",
            ConfigLevel::Option => "option",
            ConfigLevel::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Stable identifier of a node inside its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Index of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Stored entry of a node
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    Node(NodeId),
    Value(Value),
}

/// Normalize a key for storage and lookup (keys are case-insensitive)
pub fn normalize_key(key: &str) -> String {
    key.to_lowercase()
}

/// Arena storage for one node
#[derive(Debug)]
pub(crate) struct NodeData {
    level: ConfigLevel,
    entries: IndexMap<String, Slot>,
    parent: OnceLock<Option<NodeId>>,
}

impl NodeData {
    pub(crate) fn new(level: ConfigLevel) -> Self {
        Self {
            level,
            entries: IndexMap::new(),
            parent: OnceLock::new(),
        }
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn get(&self, normalized_key: &str) -> Option<&Slot> {
        self.entries.get(normalized_key)
    }

    /// Insert during the build pass; duplicate keys are rejected, never overwritten
    pub(crate) fn insert(&mut self, key: &str, slot: Slot) -> std::result::Result<(), &Slot> {
        match self.entries.entry(normalize_key(key)) {
            indexmap::map::Entry::Occupied(existing) => Err(existing.into_mut()),
            indexmap::map::Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Ok(())
            }
        }
    }

    /// Parents are assigned exactly once
    pub(crate) fn set_parent(&self, parent: Option<NodeId>) -> Result<()> {
        self.parent.set(parent).map_err(|_| {
            Error::read_only().with_help("The parent of a config node can only be set once")
        })
    }

    pub(crate) fn parent(&self) -> Option<NodeId> {
        self.parent.get().copied().flatten()
    }
}

/// An immutable, fully linked configuration tree
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
    interpolation: Arc<dyn Interpolate>,
}

impl Tree {
    pub(crate) fn new(nodes: Vec<NodeData>, root: NodeId, interpolation: Arc<dyn Interpolate>) -> Self {
        Self {
            nodes,
            root,
            interpolation,
        }
    }

    /// The topmost node
    pub fn root(&self) -> Node<'_> {
        self.node_unchecked(self.root)
    }

    /// View of the node with the given id, `None` if the id is out of range
    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        (id.0 < self.nodes.len()).then_some(Node { tree: self, id })
    }

    /// View of a node whose id came from this arena
    fn node_unchecked(&self, id: NodeId) -> Node<'_> {
        Node { tree: self, id }
    }

    /// Number of nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.nodes)
            .field("root", &self.root)
            .finish()
    }
}

/// A raw (uninterpolated) entry borrowed from a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry<'a> {
    Node(Node<'a>),
    Value(&'a Value),
}

/// A read result: either a nested node or a resolved value
#[derive(Debug, Clone, PartialEq)]
pub enum Item<'a> {
    Node(Node<'a>),
    Value(Value),
}

impl<'a> Item<'a> {
    /// The nested node, if this item is one
    pub fn as_node(&self) -> Option<Node<'a>> {
        match self {
            Item::Node(node) => Some(*node),
            Item::Value(_) => None,
        }
    }

    /// The value, if this item is one
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Node(_) => None,
            Item::Value(value) => Some(value),
        }
    }

    /// Consume the item and return its value, if it is one
    pub fn into_value(self) -> Option<Value> {
        match self {
            Item::Node(_) => None,
            Item::Value(value) => Some(value),
        }
    }
}

impl From<Value> for Item<'_> {
    fn from(value: Value) -> Self {
        Item::Value(value)
    }
}

/// Read-only view of one node
///
/// Two views are equal when they point at the same node of the same tree,
/// regardless of content.
#[derive(Clone, Copy)]
pub struct Node<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("level", &self.level())
            .field("keys", &self.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> Node<'a> {
    fn data(&self) -> &'a NodeData {
        self.tree.data(self.id)
    }

    /// Identifier of this node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The tree this node belongs to
    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    /// Level of this node
    pub fn level(&self) -> ConfigLevel {
        self.data().level
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.data().entries.len()
    }

    /// Whether this node has no entries
    pub fn is_empty(&self) -> bool {
        self.data().entries.is_empty()
    }

    /// Normalized keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.data().entries.keys().map(String::as_str)
    }

    /// Whether `key` (case-insensitive) is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.data().get(&normalize_key(key)).is_some()
    }

    /// Raw entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, Entry<'a>)> + 'a {
        let tree = self.tree;
        self.data()
            .entries
            .iter()
            .map(move |(k, slot)| (k.as_str(), entry_of(tree, slot)))
    }

    /// The enclosing node, `None` for the root
    pub fn parent(&self) -> Option<Node<'a>> {
        self.data().parent().map(|id| self.tree.node_unchecked(id))
    }

    /// The topmost node reachable through parent links
    pub fn root(&self) -> Node<'a> {
        let mut node = *self;
        while let Some(parent) = node.parent() {
            node = parent;
        }
        node
    }

    /// Look up `key` without interpolation, `None` if missing
    pub fn get_raw(&self, key: &str) -> Option<Entry<'a>> {
        self.data()
            .get(&normalize_key(key))
            .map(|slot| entry_of(self.tree, slot))
    }

    /// Look up `key`; option text referencing other options is interpolated
    pub fn get(&self, key: &str) -> Result<Item<'a>> {
        match self.get_raw(key) {
            Some(Entry::Node(node)) => Ok(Item::Node(node)),
            Some(Entry::Value(Value::String(raw))) if self.level() == ConfigLevel::Option => {
                let value = self.tree.interpolation.before_get(*self, key, raw)?;
                Ok(Item::Value(value))
            }
            Some(Entry::Value(value)) => Ok(Item::Value(value.clone())),
            None => Err(self.not_found(key)),
        }
    }

    /// Like [`Node::get`], returning `default` when the key is missing
    pub fn get_or(&self, key: &str, default: Item<'a>) -> Result<Item<'a>> {
        recover(self.get(key), default)
    }

    /// The nested node stored under `key`
    pub fn node(&self, key: &str) -> Result<Node<'a>> {
        match self.get(key)? {
            Item::Node(node) => Ok(node),
            Item::Value(value) => Err(Error::type_coercion(
                self.full_key(key).join("."),
                "node",
                value.type_name(),
            )),
        }
    }

    /// The value stored under `key`
    pub fn value(&self, key: &str) -> Result<Value> {
        match self.get(key)? {
            Item::Value(value) => Ok(value),
            Item::Node(_) => Err(Error::type_coercion(
                self.full_key(key).join("."),
                "value",
                "node",
            )),
        }
    }

    /// Like [`Node::value`], returning `default` when the key is missing
    pub fn value_or(&self, key: &str, default: impl Into<Value>) -> Result<Value> {
        recover(self.value(key), default.into())
    }

    /// Get a value as an integer
    pub fn get_int(&self, key: &str) -> Result<i64> {
        let value = self.value(key)?;
        if let Some(i) = value.as_i64() {
            return Ok(i);
        }
        match value {
            Value::String(s) => s.trim().parse().map_err(|_| {
                Error::type_coercion(
                    self.full_key(key).join("."),
                    "integer",
                    format!("string (\"{}\")", s),
                )
            }),
            other => Err(Error::type_coercion(
                self.full_key(key).join("."),
                "integer",
                other.type_name(),
            )),
        }
    }

    /// Get a value as an integer, returning `default` when the key is missing
    pub fn get_int_or(&self, key: &str, default: i64) -> Result<i64> {
        recover(self.get_int(key), default)
    }

    /// Get a value as a float
    pub fn get_float(&self, key: &str) -> Result<f64> {
        let value = self.value(key)?;
        if let Some(f) = value.as_f64() {
            return Ok(f);
        }
        match value {
            Value::String(s) => s.trim().parse().map_err(|_| {
                Error::type_coercion(
                    self.full_key(key).join("."),
                    "float",
                    format!("string (\"{}\")", s),
                )
            }),
            other => Err(Error::type_coercion(
                self.full_key(key).join("."),
                "float",
                other.type_name(),
            )),
        }
    }

    /// Get a value as a float, returning `default` when the key is missing
    pub fn get_float_or(&self, key: &str, default: f64) -> Result<f64> {
        recover(self.get_float(key), default)
    }

    /// Get a value as a boolean (`1/yes/true/on`, `0/no/false/off`)
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        let value = self.value(key)?;
        value.to_bool().ok_or_else(|| {
            Error::type_coercion(
                self.full_key(key).join("."),
                "boolean",
                format!("{} (\"{}\")", value.type_name(), value),
            )
        })
    }

    /// Get a value as a boolean, returning `default` when the key is missing
    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool> {
        recover(self.get_bool(key), default)
    }

    /// Get a value rendered as a string
    pub fn get_string(&self, key: &str) -> Result<String> {
        let value = self.value(key)?;
        match value {
            Value::String(s) => Ok(s),
            Value::Mapping(_) => Err(Error::type_coercion(
                self.full_key(key).join("."),
                "string",
                value.type_name(),
            )),
            other => Ok(other.to_string()),
        }
    }

    /// Get a value rendered as a string, returning `default` when the key is missing
    pub fn get_string_or(&self, key: &str, default: impl Into<String>) -> Result<String> {
        recover(self.get_string(key), default.into())
    }

    /// Always fails: built trees are read-only
    pub fn set(&self, _key: &str, _value: impl Into<Value>) -> Result<()> {
        Err(Error::read_only())
    }

    /// Always fails: built trees are read-only
    pub fn delete(&self, _key: &str) -> Result<()> {
        Err(Error::read_only())
    }

    /// Assign the parent link; fails because every node's parent is fixed at build time
    pub fn set_parent(&self, parent: Option<Node<'_>>) -> Result<()> {
        self.data().set_parent(parent.map(|p| p.id))
    }

    /// Path from the root down to `key`, found by matching node identity
    pub fn full_key(&self, key: &str) -> Vec<String> {
        let mut keys = vec![key.to_string()];
        let mut node = *self;

        while let Some(parent) = node.parent() {
            let name = parent
                .data()
                .entries
                .iter()
                .find(|(_, slot)| matches!(slot, Slot::Node(id) if *id == node.id))
                .map(|(k, _)| k.clone());
            if let Some(name) = name {
                keys.push(name);
            }
            node = parent;
        }

        keys.reverse();
        keys
    }

    /// Export this subtree as a nested mapping
    ///
    /// With `resolve`, option values are interpolated the same way
    /// [`Node::get`] does; otherwise stored values are returned as-is.
    pub fn to_value(&self, resolve: bool) -> Result<Value> {
        let mut map = IndexMap::new();
        for (key, entry) in self.iter() {
            let value = match entry {
                Entry::Node(node) => node.to_value(resolve)?,
                Entry::Value(raw) if !resolve => raw.clone(),
                Entry::Value(_) => self.value(key)?,
            };
            map.insert(key.to_string(), value);
        }
        Ok(Value::Mapping(map))
    }

    pub(crate) fn not_found(&self, key: &str) -> Error {
        match self.level() {
            ConfigLevel::Section => Error::no_section(key),
            ConfigLevel::Subsection => {
                Error::no_subsection(key).with_path(self.full_key(key).join("."))
            }
            ConfigLevel::Option => match <[String; 3]>::try_from(self.full_key(key)) {
                Ok([section, subsection, option]) => {
                    Error::no_option(section, subsection, option)
                }
                Err(keys) => Error::no_key(key).with_path(keys.join(".")),
            },
            ConfigLevel::Unknown => Error::no_key(key).with_path(self.full_key(key).join(".")),
        }
    }
}

fn entry_of<'a>(tree: &'a Tree, slot: &'a Slot) -> Entry<'a> {
    match slot {
        Slot::Node(id) => Entry::Node(tree.node_unchecked(*id)),
        Slot::Value(value) => Entry::Value(value),
    }
}

/// Replace a lookup miss with `default`; every other error is surfaced
pub(crate) fn recover<T>(result: Result<T>, default: T) -> Result<T> {
    match result {
        Err(e) if e.is_not_found() => Ok(default),
        other => other,
    }
}
