//! INI-style store parser for the configuration file.
//!
//! The format is deliberately small: `[section]` headers followed by
//! `key = value` entries.  A bare `key` line (no `=`) is legal and records
//! the key with an empty value; several configuration switches (e.g.
//! `not_installed`) are presence-only and carry no meaningful value.
//! Inline comments (` #` or `\t#`) are stripped from values.

use crate::error::ConfigError;

/// A parsed section: its raw header plus the key/value entries inside it.
///
/// Headers preserve original case.  Values of presence-only keys are empty
/// strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    /// The raw section header (e.g. `"search"` or a per-application name).
    pub header: String,
    /// Key-value entries within this section, in file order.
    pub entries: Vec<(String, String)>,
}

/// Parse INI content from a string.
///
/// # Examples
///
/// ```
/// use savegame_cli::config::ini::parse_sections_from_str;
///
/// let sections = parse_sections_from_str(
///     "[search]\npaths = /home # comment\n[factorio]\nnot_installed\n",
///     "demo.cfg",
/// ).unwrap();
/// assert_eq!(sections[0].header, "search");
/// assert_eq!(sections[0].entries[0], ("paths".to_string(), "/home".to_string()));
/// assert_eq!(sections[1].entries[0], ("not_installed".to_string(), String::new()));
/// ```
///
/// # Errors
///
/// Returns [`ConfigError::Syntax`] when an entry appears before the first
/// section header.
pub fn parse_sections_from_str(content: &str, file: &str) -> Result<Vec<IniSection>, ConfigError> {
    let mut sections = Vec::new();
    let mut current: Option<IniSection> = None;

    for (line_num, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = parse_section_header(trimmed) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(IniSection {
                header,
                entries: Vec::new(),
            });
        } else if let Some(ref mut section) = current {
            section.entries.push(parse_entry_line(trimmed));
        } else {
            return Err(ConfigError::Syntax {
                file: file.to_string(),
                line: line_num + 1,
                message: format!("entry outside of section: {trimmed}"),
            });
        }
    }

    if let Some(section) = current {
        sections.push(section);
    }

    Ok(sections)
}

/// Parse a `[header]` line, preserving original case.
fn parse_section_header(line: &str) -> Option<String> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let trimmed = inner.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}

/// Parse a `key = value` or bare `key` line.
///
/// Bare keys map to an empty value.  Inline comments are stripped from
/// values only, never from keys.
fn parse_entry_line(line: &str) -> (String, String) {
    line.split_once('=').map_or_else(
        || (line.trim().to_string(), String::new()),
        |(key, value)| {
            (
                key.trim().to_string(),
                strip_inline_comment(value.trim()).to_string(),
            )
        },
    )
}

/// Strip inline comments (`#` preceded by whitespace) from a value.
fn strip_inline_comment(value: &str) -> &str {
    value
        .find(" #")
        .or_else(|| value.find("\t#"))
        .map_or(value, |idx| value[..idx].trim_end())
}
