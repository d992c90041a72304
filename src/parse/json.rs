//! JSON-family strategies: direct, fenced, embedded, and Python-literal

use super::coerce::nodes_from_value;
use super::{Candidates, ParseError, ParseStrategy, StrategyKind};
use regex::Regex;
use std::sync::LazyLock;

/// Anchor for a node list inside surrounding prose.
static NODES_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']nodes["']\s*:\s*\["#).expect("valid regex"));

fn decode(text: &str) -> Result<Candidates, ParseError> {
    let value: serde_json::Value =
        serde_json::from_str(text.trim()).map_err(|e| ParseError::Json(e.to_string()))?;
    nodes_from_value(value)
}

/// The whole text is a JSON document.
pub struct DirectDecode;

impl ParseStrategy for DirectDecode {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    fn parse(&self, text: &str) -> Result<Candidates, ParseError> {
        decode(text)
    }
}

/// The JSON document is wrapped in a markdown code fence.
pub struct FenceStrip;

fn is_fence(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with("```") || line.starts_with("~~~")
}

/// Remove a leading and/or trailing fence line. `None` when neither end is fenced.
pub(crate) fn strip_fences(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let mut body = trimmed;

    let opened = is_fence(body);
    if opened {
        body = body.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    }

    let closed = body
        .trim_end()
        .rsplit_once('\n')
        .map(|(_, last)| is_fence(last))
        .unwrap_or_else(|| is_fence(body) && !opened);
    if closed {
        body = body
            .trim_end()
            .rsplit_once('\n')
            .map(|(rest, _)| rest)
            .unwrap_or("");
    }

    (opened || closed).then_some(body)
}

impl ParseStrategy for FenceStrip {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FenceStrip
    }

    fn parse(&self, text: &str) -> Result<Candidates, ParseError> {
        let body = strip_fences(text).ok_or(ParseError::NotApplicable("no code fence"))?;
        decode(body)
    }
}

/// A `{"nodes": [...]}` object embedded in other text.
pub struct ObjectExtraction;

/// Byte offset of the `}` closing the object opened at `open`. String-aware
/// for both quote styles.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Opening braces examined per anchor before giving up on it.
const MAX_WALK_BACK: usize = 32;

/// Balanced objects enclosing each `nodes` anchor, innermost first.
///
/// Lazy, so extraction stops scanning at the first object that decodes.
fn enclosing_objects(text: &str) -> impl Iterator<Item = &str> + '_ {
    NODES_ANCHOR.find_iter(text).flat_map(move |anchor| {
        let mut cursor = anchor.start();
        std::iter::from_fn(move || {
            let open = text[..cursor].rfind('{')?;
            cursor = open;
            Some(open)
        })
        .take(MAX_WALK_BACK)
        .filter_map(move |open| {
            matching_brace(text, open)
                .filter(|&close| close >= anchor.end())
                .map(|close| &text[open..=close])
        })
    })
}

impl ParseStrategy for ObjectExtraction {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ObjectExtraction
    }

    fn parse(&self, text: &str) -> Result<Candidates, ParseError> {
        let mut candidates = enclosing_objects(text).peekable();
        if candidates.peek().is_none() {
            return Err(ParseError::NotApplicable("no embedded nodes object"));
        }

        let mut last = ParseError::NoNodes;
        for candidate in candidates {
            match decode(candidate) {
                Ok(parsed) => return Ok(parsed),
                Err(e) => last = e,
            }
        }
        Err(last)
    }
}

/// Python-style literals: single quotes, `None`/`True`/`False`, trailing commas.
pub struct LiteralNormalization;

/// Rewrite Python literal syntax into JSON. Returns `None` when there was
/// nothing to rewrite.
pub(crate) fn normalize_literals(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                // Copy a double-quoted string verbatim.
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        out.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    i += 1;
                    if chars[i - 1] == '"' {
                        break;
                    }
                }
            }
            '\'' => {
                changed = true;
                out.push('"');
                i += 1;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if i + 1 < chars.len() => {
                            if chars[i + 1] == '\'' {
                                out.push('\'');
                            } else {
                                out.push('\\');
                                out.push(chars[i + 1]);
                            }
                            i += 2;
                        }
                        '\'' => {
                            i += 1;
                            break;
                        }
                        '"' => {
                            out.push_str("\\\"");
                            i += 1;
                        }
                        other => {
                            out.push(other);
                            i += 1;
                        }
                    }
                }
                out.push('"');
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, Some('}') | Some(']')) {
                    changed = true;
                } else {
                    out.push(c);
                }
                i += 1;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "None" => {
                        changed = true;
                        out.push_str("null");
                    }
                    "True" => {
                        changed = true;
                        out.push_str("true");
                    }
                    "False" => {
                        changed = true;
                        out.push_str("false");
                    }
                    _ => out.push_str(&word),
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    changed.then_some(out)
}

/// The span from the first `{`/`[` to the last `}`/`]`, skipping prose around it.
fn literal_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let end = text.rfind(['}', ']'])?;
    (end > start).then(|| &text[start..=end])
}

impl ParseStrategy for LiteralNormalization {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LiteralNormalization
    }

    fn parse(&self, text: &str) -> Result<Candidates, ParseError> {
        let span = literal_span(text).ok_or(ParseError::NotApplicable("no object or array"))?;
        let normalized =
            normalize_literals(span).ok_or(ParseError::NotApplicable("no literal syntax to rewrite"))?;

        decode(&normalized).or_else(|direct| ObjectExtraction.parse(&normalized).map_err(|_| direct))
    }
}
