//! Main Config type for zyconf
//!
//! A `Config` owns one immutable tree. It is built once from INI, JSON or
//! YAML input and then only read: option values are interpolated and
//! type-inferred on every access, never cached or written back.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::builder::TreeBuilder;
use crate::error::{Error, Result};
use crate::ini;
use crate::interpolation::{BasicInterpolation, Interpolate, NoInterpolation};
use crate::node::{recover, Entry, Item, Node, Tree};
use crate::value::Value;

/// Label of the root node in error messages
const ROOT_HEADER: &str = "ROOT";

/// Options controlling how values are stored and read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigOptions {
    /// Infer typed values from option text
    pub auto_infer: bool,
    /// Substitute `${section.subsection.option}` references on read
    pub interpolate: bool,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            auto_infer: true,
            interpolate: true,
        }
    }
}

impl ConfigOptions {
    fn interpolation(&self) -> Arc<dyn Interpolate> {
        if self.interpolate {
            Arc::new(BasicInterpolation::new().with_inference(self.auto_infer))
        } else {
            Arc::new(NoInterpolation::new(self.auto_infer))
        }
    }
}

/// A read-only configuration tree
#[derive(Debug, Clone)]
pub struct Config {
    tree: Arc<Tree>,
    options: ConfigOptions,
}

impl Config {
    /// Build a config from a nested `section -> subsection -> option` mapping
    pub fn from_mapping(mapping: &IndexMap<String, Value>, options: ConfigOptions) -> Result<Self> {
        Self::from_mapping_at(mapping, ROOT_HEADER, 0, options)
    }

    /// Build a config whose root sits at `depth`, labelled `header` in errors
    pub fn from_mapping_at(
        mapping: &IndexMap<String, Value>,
        header: &str,
        depth: usize,
        options: ConfigOptions,
    ) -> Result<Self> {
        let tree = TreeBuilder::new(options.interpolation()).build(mapping, header, depth)?;
        Ok(Self {
            tree: Arc::new(tree),
            options,
        })
    }

    /// Build a config with a custom interpolation strategy
    pub fn with_interpolation(
        mapping: &IndexMap<String, Value>,
        interpolation: Arc<dyn Interpolate>,
    ) -> Result<Self> {
        let tree = TreeBuilder::new(interpolation).build(mapping, ROOT_HEADER, 0)?;
        Ok(Self {
            tree: Arc::new(tree),
            options: ConfigOptions::default(),
        })
    }

    /// Load configuration from an INI string
    pub fn from_ini(text: &str) -> Result<Self> {
        Self::from_ini_with_options(text, ConfigOptions::default())
    }

    /// Load configuration from an INI string with options
    pub fn from_ini_with_options(text: &str, options: ConfigOptions) -> Result<Self> {
        let mapping = ini::parse(text, None)?;
        Self::from_mapping(&mapping, options)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| Error::parse(e.to_string()))?;
        Self::from_mapping(top_level_mapping(&value)?, ConfigOptions::default())
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| Error::parse(e.to_string()))?;
        Self::from_mapping(top_level_mapping(&value)?, ConfigOptions::default())
    }

    /// Load a config file, choosing the format by extension
    ///
    /// `.json` and `.yaml`/`.yml` files are deserialized; anything else is
    /// read as INI.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_with_options(path, ConfigOptions::default())
    }

    /// Load a config file with options
    pub fn read_with_options(path: impl AsRef<Path>, options: ConfigOptions) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::io(&display, e.to_string()))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        log::debug!("loading config from {}", display);

        let mapping = match extension.as_deref() {
            Some("json") => {
                let value: Value = serde_json::from_str(&content)
                    .map_err(|e| Error::parse(e.to_string()).with_path(&display))?;
                top_level_mapping(&value)?.clone()
            }
            Some("yaml") | Some("yml") => {
                let value: Value = serde_yaml::from_str(&content)
                    .map_err(|e| Error::parse(e.to_string()).with_path(&display))?;
                top_level_mapping(&value)?.clone()
            }
            _ => ini::parse(&content, Some(&display))?,
        };

        Self::from_mapping(&mapping, options)
    }

    /// The options this config was built with
    pub fn options(&self) -> ConfigOptions {
        self.options
    }

    /// The underlying tree
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// The root (SECTION-level) node
    pub fn root(&self) -> Node<'_> {
        self.tree.root()
    }

    /// Look up a dotted path such as `"db.main.host"`
    ///
    /// The empty path returns the root node.
    pub fn lookup(&self, path: &str) -> Result<Item<'_>> {
        if path.is_empty() {
            return Ok(Item::Node(self.root()));
        }
        let (node, key) = self.parent_of(path)?;
        node.get(key)
    }

    /// Look up a dotted path without interpolating the result
    pub fn lookup_raw(&self, path: &str) -> Result<Entry<'_>> {
        if path.is_empty() {
            return Ok(Entry::Node(self.root()));
        }
        let (node, key) = self.parent_of(path)?;
        node.get_raw(key).ok_or_else(|| node.not_found(key))
    }

    /// Look up the value at a dotted path
    pub fn lookup_value(&self, path: &str) -> Result<Value> {
        let (node, key) = self.parent_of(path)?;
        node.value(key)
    }

    /// Look up the value at a dotted path, returning `default` if it is missing
    pub fn lookup_or(&self, path: &str, default: impl Into<Value>) -> Result<Value> {
        recover(self.lookup_value(path), default.into())
    }

    /// Get an integer at a dotted path
    pub fn get_int(&self, path: &str) -> Result<i64> {
        let (node, key) = self.parent_of(path)?;
        node.get_int(key)
    }

    /// Get an integer at a dotted path, returning `default` if it is missing
    pub fn get_int_or(&self, path: &str, default: i64) -> Result<i64> {
        recover(self.get_int(path), default)
    }

    /// Get a float at a dotted path
    pub fn get_float(&self, path: &str) -> Result<f64> {
        let (node, key) = self.parent_of(path)?;
        node.get_float(key)
    }

    /// Get a float at a dotted path, returning `default` if it is missing
    pub fn get_float_or(&self, path: &str, default: f64) -> Result<f64> {
        recover(self.get_float(path), default)
    }

    /// Get a boolean at a dotted path
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let (node, key) = self.parent_of(path)?;
        node.get_bool(key)
    }

    /// Get a boolean at a dotted path, returning `default` if it is missing
    pub fn get_bool_or(&self, path: &str, default: bool) -> Result<bool> {
        recover(self.get_bool(path), default)
    }

    /// Get a string at a dotted path
    pub fn get_string(&self, path: &str) -> Result<String> {
        let (node, key) = self.parent_of(path)?;
        node.get_string(key)
    }

    /// Get a string at a dotted path, returning `default` if it is missing
    pub fn get_string_or(&self, path: &str, default: impl Into<String>) -> Result<String> {
        recover(self.get_string(path), default.into())
    }

    /// Resolve every option value, surfacing the first interpolation error
    pub fn resolve_all(&self) -> Result<()> {
        self.root().to_value(true).map(|_| ())
    }

    /// Export the configuration as a Value
    ///
    /// With `resolve`, option values are interpolated; otherwise the stored
    /// values are returned.
    pub fn to_value(&self, resolve: bool) -> Result<Value> {
        self.root().to_value(resolve)
    }

    /// Export the configuration as YAML
    pub fn to_yaml(&self, resolve: bool) -> Result<String> {
        let value = self.to_value(resolve)?;
        serde_yaml::to_string(&value).map_err(|e| Error::parse(e.to_string()))
    }

    /// Export the configuration as JSON
    pub fn to_json(&self, resolve: bool) -> Result<String> {
        let value = self.to_value(resolve)?;
        serde_json::to_string_pretty(&value).map_err(|e| Error::parse(e.to_string()))
    }

    /// Walk to the node holding the last segment of `path`
    fn parent_of<'a>(&self, path: &'a str) -> Result<(Node<'_>, &'a str)> {
        let (parents, key) = match path.rsplit_once('.') {
            Some((parents, key)) => (Some(parents), key),
            None => (None, path),
        };

        let mut node = self.root();
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                node = node.node(segment)?;
            }
        }
        Ok((node, key))
    }
}

fn top_level_mapping(value: &Value) -> Result<&IndexMap<String, Value>> {
    value.as_mapping().ok_or_else(|| {
        Error::parse(format!(
            "Expected a mapping at the top level, got {}",
            value.type_name()
        ))
        .with_help("Nest options as section -> subsection -> option")
    })
}
