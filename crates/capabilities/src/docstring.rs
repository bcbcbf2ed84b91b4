//! Method documentation parser.
//!
//! Line-oriented grammar, prefixes matched case-insensitively on trimmed lines:
//!
//! ```text
//! - Description: This method adds two numbers.
//! - List of parameters:
//!     - param a: First number :type: int or float
//!     - param b: Second number :type: int or float
//! :return: Sum of a and b :rtype: int or float
//! ```
//!
//! Unrecognised lines are ignored; missing fields stay empty.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

const DESCRIPTION_PREFIX: &str = "- description:";
const PARAM_PREFIX: &str = "- param";
const RTYPE_PREFIX: &str = ":rtype:";
const RETURN_PREFIX: &str = ":return:";

/// Fields extracted from a documentation block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    pub description: String,
    pub inputs: BTreeMap<String, String>,
    pub output: String,
}

fn param_regex() -> &'static Regex {
    static PARAM_RE: OnceLock<Regex> = OnceLock::new();
    PARAM_RE.get_or_init(|| {
        Regex::new(r"(?i)^- param (\w+): .*?:type:\s*(.*)$").expect("param pattern is valid")
    })
}

/// Parse a method's documentation text.
///
/// Description and each parameter keep their first match. `:rtype:` always
/// sets the output; `:return:` only fills it while it is still empty, so a
/// later `:return:` never clobbers an earlier `:rtype:`.
pub fn parse_docstring(doc: &str) -> ParsedDoc {
    let mut parsed = ParsedDoc::default();
    let mut description_seen = false;

    for line in doc.trim().lines() {
        let line = line.trim();

        if let Some(rest) = strip_prefix_ci(line, DESCRIPTION_PREFIX) {
            if !description_seen {
                parsed.description = rest.trim().to_string();
                description_seen = true;
            }
        } else if strip_prefix_ci(line, PARAM_PREFIX).is_some() {
            if let Some(cap) = param_regex().captures(line) {
                let name = cap.get(1).map(|m| m.as_str()).unwrap_or_default();
                let param_type = cap.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                parsed
                    .inputs
                    .entry(name.to_string())
                    .or_insert_with(|| param_type.to_string());
            }
        } else if let Some(rest) = strip_prefix_ci(line, RTYPE_PREFIX) {
            parsed.output = rest.trim().to_string();
        } else if let Some(rest) = strip_prefix_ci(line, RETURN_PREFIX) {
            apply_return_line(&mut parsed.output, rest);
        }
    }

    parsed
}

/// `:return: <text>` with an optional inline `:rtype: <type>` tail.
fn apply_return_line(output: &mut String, rest: &str) {
    let (text, inline_rtype) = match find_ci(rest, RTYPE_PREFIX) {
        Some(pos) => (&rest[..pos], Some(rest[pos + RTYPE_PREFIX.len()..].trim())),
        None => (rest, None),
    };

    match inline_rtype {
        Some(rtype) if !rtype.is_empty() => *output = rtype.to_string(),
        _ if output.is_empty() => *output = text.trim().to_string(),
        _ => {}
    }
}

fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&line[prefix.len()..])
    } else {
        None
    }
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets aligned with the original.
    haystack.to_ascii_lowercase().find(needle)
}
