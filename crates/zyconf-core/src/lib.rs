//! zyconf-core: Read-only hierarchical configuration with interpolation
//!
//! Configuration is organized in at most three levels: sections,
//! subsections and options. INI headers name the first two levels with
//! `[section@subsection]`; a header without a subsection uses `main`.
//! Option text may reference other options with `${section.subsection.option}`
//! and is inferred to a typed value (integers, floats, booleans, `None`,
//! quoted strings and lists) once: at build time for plain text, after
//! substitution for text that references other options.
//!
//! # Example
//!
//! ```rust
//! use zyconf_core::{Config, Value};
//!
//! let ini = r#"
//! [db@primary]
//! host = db1.local
//! port = 5432
//! url = ${db.primary.host}:${db.primary.port}
//! "#;
//!
//! let config = Config::from_ini(ini).unwrap();
//! assert_eq!(config.get_int("db.primary.port").unwrap(), 5432);
//! assert_eq!(
//!     config.lookup_value("db.primary.url").unwrap(),
//!     Value::String("db1.local:5432".into())
//! );
//! ```
//!
//! Built trees are immutable; every mutation attempt fails with
//! [`ErrorKind::ReadOnly`].

pub mod builder;
pub mod error;
pub mod ini;
pub mod interpolation;
pub mod node;
pub mod value;

mod config;

pub use builder::TreeBuilder;
pub use config::{Config, ConfigOptions};
pub use error::{Error, ErrorKind, InterpolationErrorKind, Result, SourceLocation};
pub use ini::DEFAULT_SUBSECTION;
pub use interpolation::{
    BasicInterpolation, Interpolate, NoInterpolation, OptionPath, MAX_INTERPOLATION_DEPTH,
};
pub use node::{ConfigLevel, Entry, Item, Node, NodeId, Tree, MAX_CONFIG_LEVEL};
pub use value::Value;
