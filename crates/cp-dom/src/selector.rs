//! Selector matching
//!
//! The subset components rely on: comma lists of compound selectors
//! (`tag`, `*`, `#id`, `.class`, `[attr]`, `[attr="value"]`) joined by
//! descendant or child combinators. Matching runs right to left.

use crate::{DomError, DomResult, DomTree, NodeId};

/// Parsed selector list (`a, b > c`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    /// Compounds left to right; each carries the combinator to its left neighbour
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    value: Option<String>,
}

impl SelectorList {
    pub fn parse(input: &str) -> DomResult<Self> {
        let invalid = || DomError::InvalidSelector(input.to_string());
        let selectors = split_top_level(input)
            .into_iter()
            .map(|part| parse_complex(part).ok_or_else(invalid))
            .collect::<DomResult<Vec<_>>>()?;
        if selectors.is_empty() {
            return Err(invalid());
        }
        Ok(Self { selectors })
    }

    /// Whether the element matches any selector in the list
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.selectors
            .iter()
            .any(|s| match_from(tree, node, &s.parts, s.parts.len() - 1))
    }
}

fn match_from(tree: &DomTree, node: NodeId, parts: &[(Combinator, Compound)], idx: usize) -> bool {
    let (combinator, compound) = &parts[idx];
    if !compound.matches(tree, node) {
        return false;
    }
    if idx == 0 {
        return true;
    }
    match combinator {
        Combinator::Child => tree
            .parent(node)
            .is_some_and(|p| tree.is_element(p) && match_from(tree, p, parts, idx - 1)),
        Combinator::Descendant => tree
            .ancestors(node)
            .filter(|&a| tree.is_element(a))
            .any(|a| match_from(tree, a, parts, idx - 1)),
    }
}

impl Compound {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(element) = tree.element(node) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !element.is(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| element.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, element.get_attr(&a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(expected), Some(actual)) => expected == actual,
        })
    }
}

/// Split on commas outside brackets and quotes
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;
    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn parse_complex(input: &str) -> Option<ComplexSelector> {
    let mut parts: Vec<(Combinator, Compound)> = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut buf = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    let flush = |buf: &mut String, parts: &mut Vec<(Combinator, Compound)>, pending: &mut Option<Combinator>| {
        let compound = parse_compound(buf)?;
        let combinator = pending.take().unwrap_or(Combinator::Descendant);
        parts.push((combinator, compound));
        buf.clear();
        Some(())
    };

    for ch in input.trim().chars() {
        if in_brackets {
            buf.push(ch);
            match quote {
                Some(q) if ch == q => quote = None,
                Some(_) => {}
                None if ch == '"' || ch == '\'' => quote = Some(ch),
                None if ch == ']' => in_brackets = false,
                None => {}
            }
            continue;
        }
        match ch {
            '[' => {
                buf.push(ch);
                in_brackets = true;
            }
            '>' => {
                if !buf.is_empty() {
                    flush(&mut buf, &mut parts, &mut pending)?;
                }
                if parts.is_empty() || pending == Some(Combinator::Child) {
                    return None;
                }
                pending = Some(Combinator::Child);
            }
            c if c.is_whitespace() => {
                if !buf.is_empty() {
                    flush(&mut buf, &mut parts, &mut pending)?;
                }
                if !parts.is_empty() {
                    pending.get_or_insert(Combinator::Descendant);
                }
            }
            c => buf.push(c),
        }
    }

    if in_brackets {
        return None;
    }
    if !buf.is_empty() {
        flush(&mut buf, &mut parts, &mut pending)?;
    } else if pending == Some(Combinator::Child) {
        return None;
    }
    if parts.is_empty() {
        return None;
    }
    Some(ComplexSelector { parts })
}

fn parse_compound(input: &str) -> Option<Compound> {
    let chars: Vec<char> = input.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    let tag = take_ident(&chars, &mut i);
    if !tag.is_empty() {
        compound.tag = Some(tag.to_ascii_lowercase());
    } else if chars.first() == Some(&'*') {
        i += 1;
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                i += 1;
                let id = take_ident(&chars, &mut i);
                if id.is_empty() {
                    return None;
                }
                compound.id = Some(id);
            }
            '.' => {
                i += 1;
                let class = take_ident(&chars, &mut i);
                if class.is_empty() {
                    return None;
                }
                compound.classes.push(class);
            }
            '[' => {
                let close = find_closing_bracket(&chars, i)?;
                let inner: String = chars[i + 1..close].iter().collect();
                compound.attrs.push(parse_attr(&inner)?);
                i = close + 1;
            }
            _ => return None,
        }
    }
    Some(compound)
}

fn take_ident(chars: &[char], i: &mut usize) -> String {
    let start = *i;
    while *i < chars.len() && (chars[*i].is_alphanumeric() || chars[*i] == '-' || chars[*i] == '_') {
        *i += 1;
    }
    chars[start..*i].iter().collect()
}

fn find_closing_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut quote = None;
    for (offset, &ch) in chars[open + 1..].iter().enumerate() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, ']') => return Some(open + 1 + offset),
            _ => {}
        }
    }
    None
}

fn parse_attr(inner: &str) -> Option<AttrSelector> {
    let (name, value) = match inner.split_once('=') {
        Some((name, value)) => {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (name, Some(unquoted.to_string()))
        }
        None => (inner, None),
    };
    let name = name.trim();
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == ':');
    valid.then(|| AttrSelector {
        name: name.to_ascii_lowercase(),
        value,
    })
}
