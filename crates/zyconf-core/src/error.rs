//! Error types for zyconf
//!
//! Errors are structured: a kind, the config path where the problem was
//! found, an optional source location for file input, and an actionable
//! help message.

use std::fmt;

use thiserror::Error as ThisError;

use crate::node::ConfigLevel;

/// Result type alias for zyconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for zyconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the config where the error occurred (e.g., "db.main.port")
    pub path: Option<String>,
    /// Source location (file, line) if available
    pub source_location: Option<SourceLocation>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying cause (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Location in a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: Option<usize>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    /// Malformed source text
    #[error("Parse error")]
    Parse,
    /// File could not be read
    #[error("I/O error")]
    Io,
    /// Nesting deeper than section/subsection/option
    #[error("Level of config header {header:?} exceeded max level of config ({max_level})")]
    MaxLevelExceeded { header: String, max_level: usize },
    /// A section header appears twice, or collides with the implicit default subsection
    #[error("Section {section:?} already exists")]
    DuplicateSection { section: String },
    /// A `section@subsection` pair appears twice
    #[error("Subsection {subsection:?} in section {section:?} already exists")]
    DuplicateSubsection { section: String, subsection: String },
    /// Two keys at one node are equal after normalization
    #[error("Can't set {level} key {key:?}, it was already set to {existing}")]
    DuplicateKey {
        level: ConfigLevel,
        key: String,
        existing: String,
    },
    /// Lookup miss at a SECTION-level node
    #[error("No section: {section:?}")]
    NoSection { section: String },
    /// Lookup miss at a SUBSECTION-level node
    #[error("No subsection: {subsection:?}")]
    NoSubsection { subsection: String },
    /// Lookup miss at an OPTION-level node
    #[error("No option {option:?} in {section:?}.{subsection:?}")]
    NoOption {
        section: String,
        subsection: String,
        option: String,
    },
    /// Lookup miss at a node whose level is unknown
    #[error("No key: {key:?}")]
    NoKey { key: String },
    /// Attempted mutation of a built tree
    #[error("Can not modify read only config")]
    ReadOnly,
    /// Error while substituting `${...}` references
    #[error("{0}")]
    Interpolation(InterpolationErrorKind),
    /// Type coercion failed
    #[error("Type coercion failed")]
    TypeCoercion,
}

/// Specific interpolation error categories
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum InterpolationErrorKind {
    /// Malformed `$` sequence or reference
    #[error("Bad interpolation syntax at {fragment:?}")]
    Syntax { fragment: String },
    /// Referenced path does not exist
    #[error("Bad interpolation variable reference {reference:?}")]
    Missing { reference: String },
    /// Reference chain longer than the hop limit
    #[error(
        "Interpolation depth limit exceeded in value substitution: option {option:?} in \
         {requested_by:?} contains an interpolation key which cannot be substituted in \
         {max_depth} steps"
    )]
    Depth {
        option: String,
        requested_by: String,
        max_depth: usize,
    },
    /// Value does not sit at a section/subsection/option position
    #[error("Can't interpolate value for node's level {level}")]
    Node { level: ConfigLevel },
}

impl Error {
    fn from_kind(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: None,
            source_location: None,
            help: None,
            cause: None,
        }
    }

    /// Create a new parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self {
            cause: Some(message.into()),
            ..Self::from_kind(ErrorKind::Parse)
        }
    }

    /// Create an I/O error for a file that could not be read
    pub fn io(file: impl Into<String>, message: impl Into<String>) -> Self {
        let file = file.into();
        Self {
            help: Some(format!("Check that '{}' exists and is readable", file)),
            cause: Some(message.into()),
            source_location: Some(SourceLocation { file, line: None }),
            ..Self::from_kind(ErrorKind::Io)
        }
    }

    /// Create a max level error for a header nested too deeply
    pub fn max_level_exceeded(header: impl Into<String>, max_level: usize) -> Self {
        Self {
            help: Some(
                "Only section, subsection and option levels are allowed (e.g. [section@subsection])"
                    .into(),
            ),
            ..Self::from_kind(ErrorKind::MaxLevelExceeded {
                header: header.into(),
                max_level,
            })
        }
    }

    /// Create a duplicate section error
    pub fn duplicate_section(section: impl Into<String>) -> Self {
        let section = section.into();
        Self {
            path: Some(section.clone()),
            ..Self::from_kind(ErrorKind::DuplicateSection { section })
        }
    }

    /// Create a duplicate subsection error
    pub fn duplicate_subsection(section: impl Into<String>, subsection: impl Into<String>) -> Self {
        let section = section.into();
        let subsection = subsection.into();
        Self {
            path: Some(format!("{}.{}", section, subsection)),
            ..Self::from_kind(ErrorKind::DuplicateSubsection {
                section,
                subsection,
            })
        }
    }

    /// Create a duplicate key error
    pub fn duplicate_key(
        level: ConfigLevel,
        key: impl Into<String>,
        existing: impl Into<String>,
    ) -> Self {
        let key = key.into();
        Self {
            path: Some(key.clone()),
            help: Some("Keys are case-insensitive; remove or rename one of them".into()),
            ..Self::from_kind(ErrorKind::DuplicateKey {
                level,
                key,
                existing: existing.into(),
            })
        }
    }

    /// Create a missing section error
    pub fn no_section(section: impl Into<String>) -> Self {
        let section = section.into();
        Self {
            path: Some(section.clone()),
            ..Self::from_kind(ErrorKind::NoSection { section })
        }
    }

    /// Create a missing subsection error
    pub fn no_subsection(subsection: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::NoSubsection {
            subsection: subsection.into(),
        })
    }

    /// Create a missing option error
    pub fn no_option(
        section: impl Into<String>,
        subsection: impl Into<String>,
        option: impl Into<String>,
    ) -> Self {
        let (section, subsection, option) = (section.into(), subsection.into(), option.into());
        Self {
            path: Some(format!("{}.{}.{}", section, subsection, option)),
            ..Self::from_kind(ErrorKind::NoOption {
                section,
                subsection,
                option,
            })
        }
    }

    /// Create a missing key error for a node of unknown level
    pub fn no_key(key: impl Into<String>) -> Self {
        Self::from_kind(ErrorKind::NoKey { key: key.into() })
    }

    /// Create a read-only error
    pub fn read_only() -> Self {
        Self {
            help: Some("Configuration trees are immutable once built".into()),
            ..Self::from_kind(ErrorKind::ReadOnly)
        }
    }

    /// Create an interpolation syntax error
    pub fn interpolation_syntax(fragment: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            path: Some(context.into()),
            help: Some("Use ${section.subsection.option} for references and $$ for a literal $".into()),
            ..Self::from_kind(ErrorKind::Interpolation(InterpolationErrorKind::Syntax {
                fragment: fragment.into(),
            }))
        }
    }

    /// Create a missing interpolation target error
    pub fn interpolation_missing(reference: impl Into<String>, context: impl Into<String>) -> Self {
        let reference = reference.into();
        Self {
            path: Some(context.into()),
            help: Some(format!(
                "Check that '{}' exists in the configuration",
                reference
            )),
            ..Self::from_kind(ErrorKind::Interpolation(InterpolationErrorKind::Missing {
                reference,
            }))
        }
    }

    /// Create an interpolation depth error
    pub fn interpolation_depth(
        option: impl Into<String>,
        requested_by: impl Into<String>,
        max_depth: usize,
    ) -> Self {
        let requested_by = requested_by.into();
        Self {
            path: Some(requested_by.clone()),
            help: Some("Reference the final value directly instead of chaining references".into()),
            ..Self::from_kind(ErrorKind::Interpolation(InterpolationErrorKind::Depth {
                option: option.into(),
                requested_by,
                max_depth,
            }))
        }
    }

    /// Create an error for interpolation outside of an option position
    pub fn interpolation_node(level: ConfigLevel) -> Self {
        Self::from_kind(ErrorKind::Interpolation(InterpolationErrorKind::Node {
            level,
        }))
    }

    /// Create a type coercion error
    pub fn type_coercion(
        path: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self {
            path: Some(path.into()),
            help: Some(format!(
                "Ensure the value can be converted to {}",
                expected.into()
            )),
            cause: Some(format!("Got: {}", got.into())),
            ..Self::from_kind(ErrorKind::TypeCoercion)
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add source location to the error
    pub fn with_source_location(mut self, loc: SourceLocation) -> Self {
        self.source_location = Some(loc);
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Whether this is a lookup miss that a caller-supplied default may absorb
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::NoSection { .. }
                | ErrorKind::NoSubsection { .. }
                | ErrorKind::NoOption { .. }
                | ErrorKind::NoKey { .. }
        )
    }

    /// Whether this error came from `${...}` substitution
    pub fn is_interpolation(&self) -> bool {
        matches!(self.kind, ErrorKind::Interpolation(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(loc) = &self.source_location {
            write!(f, "\n  File: {}", loc.file)?;
            if let Some(line) = loc.line {
                write!(f, ":{}", line)?;
            }
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_option_error_display() {
        let err = Error::no_option("db", "main", "port");
        let display = format!("{}", err);

        assert!(display.contains("No option \"port\" in \"db\".\"main\""));
        assert!(display.contains("Path: db.main.port"));
    }

    #[test]
    fn test_not_found_kinds() {
        assert!(Error::no_section("a").is_not_found());
        assert!(Error::no_subsection("b").is_not_found());
        assert!(Error::no_option("a", "b", "c").is_not_found());
        assert!(Error::no_key("k").is_not_found());

        assert!(!Error::read_only().is_not_found());
        assert!(!Error::interpolation_missing("a.b.c", "x.y.z").is_not_found());
        assert!(!Error::type_coercion("a.b.c", "integer", "string").is_not_found());
    }

    #[test]
    fn test_duplicate_key_error_display() {
        let err = Error::duplicate_key(ConfigLevel::Option, "db.main.host", "'localhost'");
        let display = format!("{}", err);

        assert!(display.contains("Can't set option key \"db.main.host\""));
        assert!(display.contains("already set to 'localhost'"));
        assert!(display.contains("Help:"));
    }

    #[test]
    fn test_interpolation_depth_display() {
        let err = Error::interpolation_depth("nick", "tuns.profile", 1);
        let display = format!("{}", err);

        assert!(display.contains("depth limit exceeded"));
        assert!(display.contains("\"nick\""));
        assert!(display.contains("in 1 steps"));
        assert!(err.is_interpolation());
    }

    #[test]
    fn test_interpolation_missing_display() {
        let err = Error::interpolation_missing("missing.sect.opt", "tuns.profile.name");
        let display = format!("{}", err);

        assert!(display.contains("\"missing.sect.opt\""));
        assert!(display.contains("Path: tuns.profile.name"));
    }

    #[test]
    fn test_max_level_display() {
        let err = Error::max_level_exceeded("a.c.d", 3);
        let display = format!("{}", err);

        assert!(display.contains("\"a.c.d\""));
        assert!(display.contains("max level of config (3)"));
    }

    #[test]
    fn test_with_source_location() {
        let err = Error::parse("missing section header").with_source_location(SourceLocation {
            file: "app.ini".into(),
            line: Some(3),
        });
        let display = format!("{}", err);

        assert!(display.contains("app.ini:3"));
        assert!(display.contains("missing section header"));
    }

    #[test]
    fn test_with_help() {
        let err = Error::read_only().with_help("Build a new tree instead");
        assert!(format!("{}", err).contains("Help: Build a new tree instead"));
    }

    #[test]
    fn test_type_coercion_error() {
        let err = Error::type_coercion("server.main.port", "integer", "string (\"abc\")");
        let display = format!("{}", err);

        assert!(display.contains("Type coercion failed"));
        assert!(display.contains("Path: server.main.port"));
        assert!(display.contains("Got: string"));
    }
}
