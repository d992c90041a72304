//! Indented outline strategy
//!
//! Reads bullet lists, numbered lists, markdown headings and box-drawing trees.
//! Depth comes from leading whitespace after tree glyphs are blanked out;
//! each line's parent is the nearest preceding line with smaller indentation.

use super::{Candidates, ParseError, ParseStrategy, StrategyKind};
use crate::map::Node;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*+•◦▪‣●○]|\d{1,3}[.)])\s+").expect("valid regex"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+").expect("valid regex"));

const TAB_WIDTH: usize = 4;

pub struct OutlineParse;

struct Line {
    indent: usize,
    text: String,
    marked: bool,
}

fn is_box_drawing(c: char) -> bool {
    ('\u{2500}'..='\u{257F}').contains(&c)
}

/// Blank out tree glyphs and expand tabs in the line's leading prefix.
/// Returns the indentation width, whether a glyph was seen, and the rest.
fn split_prefix(raw: &str) -> (usize, bool, &str) {
    let mut indent = 0;
    let mut glyph = false;
    let mut rest = raw;

    loop {
        let mut chars = rest.chars();
        let Some(c) = chars.next() else { break };
        let next = chars.clone().next();
        let connector = match c {
            ' ' => {
                indent += 1;
                false
            }
            '\t' => {
                indent += TAB_WIDTH;
                false
            }
            c if is_box_drawing(c) => true,
            '|' | '`' => true,
            // ASCII connectors: `+--`, `|--`, `` `-- ``
            '+' | '-' if next == Some('-') => true,
            _ => break,
        };
        if connector {
            indent += 1;
            glyph = true;
        }
        rest = chars.as_str();
    }

    (indent, glyph, rest)
}

/// Ellipses, horizontal rules and bare bracket lines carry no topic.
fn is_filler(text: &str) -> bool {
    matches!(text, "..." | "…" | "etc" | "etc.")
        || text.chars().all(|c| "-=~{}[](),:;".contains(c))
}

fn read_line(raw: &str) -> Option<Line> {
    if raw.trim_start().starts_with("```") || raw.trim_start().starts_with("~~~") {
        return None;
    }

    let (mut indent, glyph, rest) = split_prefix(raw);
    let mut marked = glyph;
    let mut body = rest;

    if let Some(m) = HEADING.captures(body) {
        // Deeper headings nest under shallower ones.
        let level = m.get(1).map(|g| g.as_str().len()).unwrap_or(1);
        indent += (level - 1) * 2;
        body = &body[m.get(0).map(|g| g.end()).unwrap_or(0)..];
        marked = true;
    } else if let Some(m) = BULLET.find(body) {
        body = &body[m.end()..];
        marked = true;
    }

    let text = body
        .trim()
        .trim_matches(|c| c == '*' || c == '_')
        .trim()
        .to_string();
    if text.is_empty() || is_filler(&text) {
        return None;
    }

    Some(Line {
        indent,
        text,
        marked,
    })
}

impl ParseStrategy for OutlineParse {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Outline
    }

    fn parse(&self, text: &str) -> Result<Candidates, ParseError> {
        let lines: Vec<Line> = text.lines().filter_map(read_line).collect();
        if lines.is_empty() {
            return Err(ParseError::NotApplicable("no outline lines"));
        }

        let levels: BTreeSet<usize> = lines.iter().map(|l| l.indent).collect();
        let looks_like_outline = lines.iter().any(|l| l.marked) || (lines.len() >= 2 && levels.len() >= 2);
        if !looks_like_outline {
            return Err(ParseError::NotApplicable("text does not look like an outline"));
        }

        let mut nodes = Vec::with_capacity(lines.len());
        let mut stack: Vec<(usize, String)> = Vec::new();

        for (i, line) in lines.into_iter().enumerate() {
            while stack.last().is_some_and(|(indent, _)| *indent >= line.indent) {
                stack.pop();
            }

            let id = (i + 1).to_string();
            let mut node = Node::new(id.clone(), line.text);
            node.parent = stack.last().map(|(_, parent)| parent.clone());
            nodes.push(node);
            stack.push((line.indent, id));
        }

        Ok(Candidates {
            nodes,
            rejected: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(text: &str) -> Vec<(String, String, Option<String>)> {
        OutlineParse
            .parse(text)
            .unwrap()
            .nodes
            .into_iter()
            .map(|n| (n.id, n.text, n.parent))
            .collect()
    }

    fn parents(text: &str) -> Vec<Option<String>> {
        shape(text).into_iter().map(|(_, _, p)| p).collect()
    }

    #[test]
    fn bulleted_outline() {
        let nodes = shape("- Topic A\n  - Sub 1\n  - Sub 2\n- Topic B");
        assert_eq!(
            nodes,
            vec![
                ("1".into(), "Topic A".into(), None),
                ("2".into(), "Sub 1".into(), Some("1".into())),
                ("3".into(), "Sub 2".into(), Some("1".into())),
                ("4".into(), "Topic B".into(), None),
            ]
        );
    }

    #[test]
    fn numbered_and_tab_indented() {
        let got = parents("1. Plan\n\t2) Budget\n\t\t- Q3\n3. Review");
        assert_eq!(got, vec![None, Some("1".into()), Some("2".into()), None]);
    }

    #[test]
    fn unicode_tree_glyphs() {
        let text = "Project\n├── Design\n│   └── Mockups\n└── Launch";
        assert_eq!(
            shape(text).into_iter().map(|(_, t, _)| t).collect::<Vec<_>>(),
            vec!["Project", "Design", "Mockups", "Launch"]
        );
        assert_eq!(
            parents(text),
            vec![None, Some("1".into()), Some("2".into()), Some("1".into())]
        );
    }

    #[test]
    fn ascii_tree_glyphs() {
        let text = "Root\n|-- Left\n|   `-- Leaf\n`-- Right";
        assert_eq!(
            parents(text),
            vec![None, Some("1".into()), Some("2".into()), Some("1".into())]
        );
    }

    #[test]
    fn headings_nest_by_level() {
        let got = parents("# Meeting\n## Actions\n### Owners\n## Decisions");
        assert_eq!(got, vec![None, Some("1".into()), Some("2".into()), Some("1".into())]);
    }

    #[test]
    fn skips_blank_filler_and_fence_lines() {
        let text = "```\n- A\n\n  - ...\n---\n  - **B**\n```";
        let nodes = shape(text);
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].1, "B");
        assert_eq!(nodes[1].2.as_deref(), Some("1"));
    }

    #[test]
    fn dedent_to_intermediate_level_attaches_to_nearest_shallower() {
        let got = parents("- A\n    - B\n  - C");
        assert_eq!(got, vec![None, Some("1".into()), Some("1".into())]);
    }

    #[test]
    fn single_plain_line_is_not_an_outline() {
        assert!(matches!(
            OutlineParse.parse("not json at all, no structure"),
            Err(ParseError::NotApplicable(_))
        ));
    }

    #[test]
    fn flat_prose_is_not_an_outline() {
        assert!(OutlineParse.parse("first sentence\nsecond sentence").is_err());
    }

    #[test]
    fn indented_prose_without_markers_is_accepted() {
        let got = parents("Goals\n  Hiring\n  Budget");
        assert_eq!(got, vec![None, Some("1".into()), Some("1".into())]);
    }
}
