//! INI text adapter
//!
//! Splits INI text into the nested mapping the tree builder consumes:
//! `{section: {subsection: {option: text}}}`. Headers name a section and an
//! optional subsection separated by `@`:
//!
//! ```text
//! [database@primary]
//! host = db1.local
//!
//! ; same as [logging@main]
//! [logging]
//! level = info
//! ```
//!
//! Comments take a whole line. Indented lines continue the previous value.
//! Values are kept as text; inference and key normalization happen when
//! the tree is built.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result, SourceLocation};
use crate::node::{ConfigLevel, MAX_CONFIG_LEVEL};
use crate::value::Value;

/// Subsection used when a header names only a section
pub const DEFAULT_SUBSECTION: &str = "main";

/// Label used for errors in text that did not come from a file
const STRING_SOURCE: &str = "<string>";

/// One `[header]` block as written in the source
struct Block {
    line: usize,
    options: IndexMap<String, String>,
}

/// Parse INI `text` into a nested mapping
///
/// `source` names the file in error locations.
pub fn parse(text: &str, source: Option<&str>) -> Result<IndexMap<String, Value>> {
    let source = source.unwrap_or(STRING_SOURCE);
    let blocks = tokenize(text, source)?;

    let mut sections: IndexMap<String, IndexMap<String, Value>> = IndexMap::new();
    for (header, block) in blocks {
        let at_line = |e: Error| e.with_source_location(location(source, block.line));
        let (section, subsection) = split_header(&header).map_err(at_line)?;

        let subsections = sections.entry(section.clone()).or_default();
        let subsection = match subsection {
            Some(name) => {
                if subsections.contains_key(&name) {
                    return Err(at_line(Error::duplicate_subsection(&section, name)));
                }
                name
            }
            None => {
                if subsections.contains_key(DEFAULT_SUBSECTION) {
                    return Err(at_line(Error::duplicate_section(&section)));
                }
                DEFAULT_SUBSECTION.to_string()
            }
        };

        let options = block
            .options
            .into_iter()
            .map(|(key, text)| (key, Value::String(text)))
            .collect();
        subsections.insert(subsection, Value::Mapping(options));
    }

    log::debug!("parsed {} sections from {}", sections.len(), source);
    Ok(sections
        .into_iter()
        .map(|(name, subsections)| (name, Value::Mapping(subsections)))
        .collect())
}

/// Collect header blocks and their options, in source order
fn tokenize(text: &str, source: &str) -> Result<IndexMap<String, Block>> {
    let mut blocks: IndexMap<String, Block> = IndexMap::new();
    let mut current: Option<String> = None;
    let mut last_option: Option<String> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let lineno = idx + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let indented = raw_line.starts_with(char::is_whitespace);
        if indented {
            if let (Some(header), Some(option)) = (&current, &last_option) {
                if let Some(value) = blocks
                    .get_mut(header)
                    .and_then(|block| block.options.get_mut(option))
                {
                    value.push('\n');
                    value.push_str(line);
                    continue;
                }
            }
        }

        if let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let header = inner.trim();
            if header.is_empty() {
                return Err(Error::parse("Empty section header")
                    .with_source_location(location(source, lineno)));
            }
            if blocks.contains_key(header) {
                return Err(Error::duplicate_section(header)
                    .with_source_location(location(source, lineno)));
            }
            blocks.insert(
                header.to_string(),
                Block {
                    line: lineno,
                    options: IndexMap::new(),
                },
            );
            current = Some(header.to_string());
            last_option = None;
            continue;
        }

        let Some(header) = &current else {
            return Err(Error::parse(format!("Missing section header before {:?}", line))
                .with_source_location(location(source, lineno))
                .with_help("Start the file with a header such as [section] or [section@subsection]"));
        };

        let Some(pos) = line.find(['=', ':']) else {
            return Err(Error::parse(format!("Expected 'key = value', got {:?}", line))
                .with_source_location(location(source, lineno)));
        };
        let key = line[..pos].trim();
        let value = line[pos + 1..].trim();
        if key.is_empty() {
            return Err(Error::parse(format!("Missing option name in {:?}", line))
                .with_source_location(location(source, lineno)));
        }

        let Some(block) = blocks.get_mut(header) else {
            continue;
        };
        if let Some(existing) = block.options.get(key) {
            return Err(Error::duplicate_key(
                ConfigLevel::Option,
                format!("{}.{}", header, key),
                format!("{:?}", existing),
            )
            .with_source_location(location(source, lineno)));
        }
        block.options.insert(key.to_string(), value.to_string());
        last_option = Some(key.to_string());
    }

    Ok(blocks)
}

fn header_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@+").expect("valid header pattern"))
}

/// Split `section@subsection` into its parts, dropping empty segments
pub fn split_header(header: &str) -> Result<(String, Option<String>)> {
    let parts: Vec<&str> = header_split_re()
        .split(header)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    match parts.as_slice() {
        [] => Err(Error::parse(format!("Invalid section header [{}]", header))),
        [section] => Ok((section.to_string(), None)),
        [section, subsection] => Ok((section.to_string(), Some(subsection.to_string()))),
        _ => Err(Error::max_level_exceeded(header, MAX_CONFIG_LEVEL)),
    }
}

fn location(source: &str, line: usize) -> SourceLocation {
    SourceLocation {
        file: source.to_string(),
        line: Some(line),
    }
}
