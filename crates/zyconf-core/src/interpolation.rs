//! Interpolation of option values
//!
//! Option text may reference other options with
//! `${section.subsection.option}` and escape a dollar sign with `$$`:
//!
//! ```text
//! [tuns@profile]
//! nick = tuns
//! name = Nguyen Sinh Tu with nick = ${tuns.profile.nick}
//! ```
//!
//! References are substituted with the referenced *raw* value, using an
//! explicit work stack instead of recursion. A referenced value may itself
//! contain references only up to [`MAX_INTERPOLATION_DEPTH`] hops, so
//! `a -> c` resolves while `a -> b -> c` is rejected.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::node::{Entry, Node};
use crate::value::Value;

/// Number of reference hops allowed beyond the value being read
pub const MAX_INTERPOLATION_DEPTH: usize = 1;

/// Hooks run when values enter and leave a tree
///
/// Each tree owns one implementation, chosen when it is built.
pub trait Interpolate: Send + Sync {
    /// Transform a leaf value while the tree is being built
    fn before_set(&self, raw: Value) -> Value;

    /// Produce the value returned for `key` of the OPTION-level `node`,
    /// given its stored text
    fn before_get(&self, node: Node<'_>, key: &str, raw: &str) -> Result<Value>;
}

/// `${section.subsection.option}` interpolation
#[derive(Debug, Clone)]
pub struct BasicInterpolation {
    infer: bool,
}

impl Default for BasicInterpolation {
    fn default() -> Self {
        Self { infer: true }
    }
}

impl BasicInterpolation {
    /// Interpolation with literal type inference enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable literal type inference of stored and substituted text
    pub fn with_inference(mut self, infer: bool) -> Self {
        self.infer = infer;
        self
    }

    /// Substitute every reference in `raw`, read from `origin`, and return the final text
    pub fn substitute(&self, root: Node<'_>, origin: &OptionPath, raw: &str) -> Result<String> {
        let mut fragments: Vec<String> = Vec::new();
        let mut stack = vec![Frame {
            path: origin.clone(),
            text: raw.to_string(),
            hops: 0,
            scan: true,
        }];

        while let Some(frame) = stack.pop() {
            if frame.hops > MAX_INTERPOLATION_DEPTH {
                return Err(Error::interpolation_depth(
                    &frame.path.option,
                    origin.to_string(),
                    MAX_INTERPOLATION_DEPTH,
                ));
            }

            if !frame.scan {
                fragments.push(frame.text);
                continue;
            }

            let mut rest = frame.text.as_str();
            while !rest.is_empty() {
                let Some(p) = rest.find('$') else {
                    fragments.push(rest.to_string());
                    break;
                };
                if p > 0 {
                    fragments.push(rest[..p].to_string());
                }
                rest = &rest[p..];

                match rest[1..].chars().next() {
                    Some('$') => {
                        fragments.push("$".to_string());
                        rest = &rest[2..];
                    }
                    Some('{') => {
                        let caps = reference_re()
                            .captures(rest)
                            .ok_or_else(|| syntax_error(rest, &frame.path))?;
                        let end = caps.get(0).map_or(rest.len(), |m| m.end());
                        let reference = &caps[1];
                        let target = OptionPath::parse(reference)
                            .ok_or_else(|| syntax_error(rest, &frame.path))?;
                        let value = lookup_raw(root, &target).ok_or_else(|| {
                            Error::interpolation_missing(reference, frame.path.to_string())
                        })?;

                        log::trace!(
                            "substituting ${{{}}} in {} (hop {})",
                            target,
                            frame.path,
                            frame.hops + 1
                        );

                        // the tail is scanned after the referenced value
                        let tail = &rest[end..];
                        if !tail.is_empty() {
                            stack.push(Frame {
                                path: frame.path.clone(),
                                text: tail.to_string(),
                                hops: frame.hops,
                                scan: true,
                            });
                        }
                        stack.push(Frame {
                            path: target,
                            text: value.to_literal(),
                            hops: frame.hops + 1,
                            scan: value.is_string(),
                        });
                        break;
                    }
                    _ => return Err(syntax_error(rest, &frame.path)),
                }
            }
        }

        Ok(fragments.concat())
    }

    fn infer(&self, text: String) -> Value {
        if self.infer {
            Value::infer(&text)
        } else {
            Value::String(text)
        }
    }
}

impl Interpolate for BasicInterpolation {
    /// Text containing `$` is kept as written and inferred after substitution
    fn before_set(&self, raw: Value) -> Value {
        match raw {
            Value::String(s) if !needs_processing(&s) => self.infer(s),
            other => other,
        }
    }

    fn before_get(&self, node: Node<'_>, key: &str, raw: &str) -> Result<Value> {
        if !needs_processing(raw) {
            return Ok(Value::String(raw.to_string()));
        }
        let [section, subsection, option] = <[String; 3]>::try_from(node.full_key(key))
            .map_err(|_| Error::interpolation_node(node.level()))?;
        let origin = OptionPath {
            section,
            subsection,
            option,
        };
        let text = self.substitute(node.root(), &origin, raw)?;
        Ok(self.infer(text))
    }
}

/// Stores and returns text as-is, apart from optional type inference at build time
#[derive(Debug, Clone, Default)]
pub struct NoInterpolation {
    infer: bool,
}

impl NoInterpolation {
    pub fn new(infer: bool) -> Self {
        Self { infer }
    }
}

impl Interpolate for NoInterpolation {
    fn before_set(&self, raw: Value) -> Value {
        match raw {
            Value::String(s) if self.infer => Value::infer(&s),
            other => other,
        }
    }

    fn before_get(&self, _node: Node<'_>, _key: &str, raw: &str) -> Result<Value> {
        Ok(Value::String(raw.to_string()))
    }
}

/// Fully qualified location of an option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionPath {
    pub section: String,
    pub subsection: String,
    pub option: String,
}

impl OptionPath {
    /// Split `section.subsection.option`; any other arity is rejected
    pub fn parse(reference: &str) -> Option<Self> {
        let mut parts = reference.split('.');
        let (section, subsection, option) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            section: section.to_string(),
            subsection: subsection.to_string(),
            option: option.to_string(),
        })
    }
}

impl std::fmt::Display for OptionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.section, self.subsection, self.option)
    }
}

/// Pending text on the work stack
struct Frame {
    path: OptionPath,
    text: String,
    hops: usize,
    scan: bool,
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\$\{([\w.]+)\}").expect("valid reference pattern"))
}

fn syntax_error(fragment: &str, context: &OptionPath) -> Error {
    Error::interpolation_syntax(fragment, context.to_string())
}

/// Fetch the stored value at `path` without interpolating it
fn lookup_raw<'a>(root: Node<'a>, path: &OptionPath) -> Option<&'a Value> {
    let Some(Entry::Node(section)) = root.get_raw(&path.section) else {
        return None;
    };
    let Some(Entry::Node(subsection)) = section.get_raw(&path.subsection) else {
        return None;
    };
    match subsection.get_raw(&path.option) {
        Some(Entry::Value(value)) => Some(value),
        _ => None,
    }
}

/// Check if a string contains any `$` that would be processed on read
pub fn needs_processing(input: &str) -> bool {
    input.contains('$')
}
