//! Location-path selectors for structural matching.
//!
//! Supports the subset of XPath-like location paths the alteration rules
//! need: descendant searches (`//Name`), rooted paths (`/A/B`), wildcard
//! steps (`*`), trailing attribute steps (`//Node/@Name`), and predicates
//! `[@Attr='v']`, `[text()='v']`, and `[n]` (1-based position within the
//! matched sibling group). Selectors are parsed eagerly so configuration
//! errors surface before any document is touched.

use std::fmt;

use crate::dom::{Document, Element, XmlNode};
use crate::error::{Error, Result};

/// A parsed structural selector.
#[derive(Debug, Clone)]
pub struct Selector {
    raw: String,
    anchor: Anchor,
    steps: Vec<Step>,
    attribute: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Anchor {
    /// `/A/B` — the first step must match the document element.
    Root,
    /// `//A/B` — the first step matches at any depth.
    Descendant,
    /// `A/B` — steps match starting at the context element's children.
    Relative,
}

#[derive(Debug, Clone)]
pub(crate) struct Step {
    target: Target,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone)]
enum Target {
    Name(String),
    Any,
}

#[derive(Debug, Clone)]
enum Predicate {
    AttrEquals(String, String),
    TextEquals(String),
    Position(usize),
}

/// One matched location: either a whole node or a named attribute of a node.
/// Paths are child-index chains from the document element (empty = the
/// document element itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Hit {
    Node(Vec<usize>),
    Attribute(Vec<usize>, String),
}

impl Hit {
    pub(crate) fn path(&self) -> &[usize] {
        match self {
            Hit::Node(p) => p,
            Hit::Attribute(p, _) => p,
        }
    }

    fn attr(&self) -> Option<&str> {
        match self {
            Hit::Node(_) => None,
            Hit::Attribute(_, name) => Some(name),
        }
    }
}

impl Selector {
    /// Parse a selector expression. Syntax errors are
    /// [`Error::MalformedSelector`].
    pub fn parse(expr: &str) -> Result<Selector> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(Error::MalformedSelector("empty selector".to_string()));
        }

        let (anchor, rest) = if let Some(r) = trimmed.strip_prefix("//") {
            (Anchor::Descendant, r)
        } else if let Some(r) = trimmed.strip_prefix('/') {
            (Anchor::Root, r)
        } else {
            (Anchor::Relative, trimmed)
        };

        let parts = split_steps(rest, trimmed)?;
        let mut steps = Vec::new();
        let mut attribute = None;
        let count = parts.len();
        for (i, part) in parts.iter().enumerate() {
            if let Some(name) = part.strip_prefix('@') {
                if i + 1 != count {
                    return Err(malformed(trimmed, "attribute step must be last"));
                }
                validate_name(name, trimmed)?;
                attribute = Some(name.to_string());
            } else {
                steps.push(parse_step(part, trimmed)?);
            }
        }

        if steps.is_empty() && attribute.is_none() {
            return Err(malformed(trimmed, "selector has no steps"));
        }

        Ok(Selector {
            raw: trimmed.to_string(),
            anchor,
            steps,
            attribute,
        })
    }

    /// The single relative element step of a child selector, if this selector
    /// has that shape. Used by reorder rules, which only sort direct children.
    pub(crate) fn child_step(&self) -> Option<&Step> {
        if self.anchor == Anchor::Relative && self.steps.len() == 1 && self.attribute.is_none() {
            self.steps.first()
        } else {
            None
        }
    }

    /// Evaluate against a whole document, returning all matched locations in
    /// document order (a node before its attributes, ancestors before
    /// descendants, siblings left to right).
    pub(crate) fn find(&self, doc: &Document) -> Vec<Hit> {
        let mut hits = Vec::new();
        match self.anchor {
            Anchor::Root => {
                if let Some(first) = self.steps.first() {
                    if first.matches_lone(&doc.root) {
                        self.descend(&doc.root, Vec::new(), 1, &mut hits);
                    }
                } else {
                    // bare "/@Attr"
                    self.terminal(&doc.root, Vec::new(), &mut hits);
                }
            }
            Anchor::Relative => {
                self.descend(&doc.root, Vec::new(), 0, &mut hits);
            }
            Anchor::Descendant => {
                if let Some(first) = self.steps.first() {
                    // The document element is a sibling group of one.
                    if first.matches_lone(&doc.root) {
                        self.descend(&doc.root, Vec::new(), 1, &mut hits);
                    }
                    for_each_element(&doc.root, &mut Vec::new(), &mut |el, path| {
                        for (i, child) in first.filter_children(el) {
                            let mut p = path.to_vec();
                            p.push(i);
                            self.descend(child, p, 1, &mut hits);
                        }
                    });
                } else {
                    // bare "//@Attr": every element carrying the attribute
                    for_each_element(&doc.root, &mut Vec::new(), &mut |el, path| {
                        self.terminal(el, path.to_vec(), &mut hits);
                    });
                }
            }
        }
        hits.sort_by(|a, b| a.path().cmp(b.path()).then_with(|| a.attr().cmp(&b.attr())));
        hits
    }

    fn descend(&self, el: &Element, path: Vec<usize>, step_idx: usize, hits: &mut Vec<Hit>) {
        match self.steps.get(step_idx) {
            None => self.terminal(el, path, hits),
            Some(step) => {
                for (i, child) in step.filter_children(el) {
                    let mut p = path.clone();
                    p.push(i);
                    self.descend(child, p, step_idx + 1, hits);
                }
            }
        }
    }

    fn terminal(&self, el: &Element, path: Vec<usize>, hits: &mut Vec<Hit>) {
        match &self.attribute {
            Some(name) => {
                if el.attr(name).is_some() {
                    hits.push(Hit::Attribute(path, name.clone()));
                }
            }
            None => hits.push(Hit::Node(path)),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Step {
    fn name_matches(&self, name: &str) -> bool {
        match &self.target {
            Target::Name(n) => n == name,
            Target::Any => true,
        }
    }

    /// Match this step against an element that has no sibling group (the
    /// document element). Position predicates only accept position 1 here.
    fn matches_lone(&self, el: &Element) -> bool {
        if !self.name_matches(&el.name) {
            return false;
        }
        self.predicates.iter().all(|pred| match pred {
            Predicate::Position(n) => *n == 1,
            Predicate::AttrEquals(name, value) => el.attr(name) == Some(value.as_str()),
            Predicate::TextEquals(value) => el.direct_text() == *value,
        })
    }

    /// Children of `parent` matched by this step, with their child indices,
    /// in document order. Predicates apply left to right; position predicates
    /// index into the candidate list as filtered so far.
    pub(crate) fn filter_children<'a>(&self, parent: &'a Element) -> Vec<(usize, &'a Element)> {
        let mut cands: Vec<(usize, &Element)> = parent
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_element().map(|e| (i, e)))
            .filter(|(_, e)| self.name_matches(&e.name))
            .collect();
        for pred in &self.predicates {
            cands = match pred {
                Predicate::Position(n) => cands.into_iter().skip(n - 1).take(1).collect(),
                Predicate::AttrEquals(name, value) => cands
                    .into_iter()
                    .filter(|(_, e)| e.attr(name) == Some(value.as_str()))
                    .collect(),
                Predicate::TextEquals(value) => cands
                    .into_iter()
                    .filter(|(_, e)| e.direct_text() == *value)
                    .collect(),
            };
        }
        cands
    }
}

fn for_each_element<'a, F>(el: &'a Element, path: &mut Vec<usize>, f: &mut F)
where
    F: FnMut(&'a Element, &[usize]),
{
    f(el, path);
    for (i, child) in el.children.iter().enumerate() {
        if let XmlNode::Element(e) = child {
            path.push(i);
            for_each_element(e, path, f);
            path.pop();
        }
    }
}

fn malformed(expr: &str, why: &str) -> Error {
    Error::MalformedSelector(format!("'{expr}': {why}"))
}

/// Split a step list on `/`, ignoring separators inside predicates and
/// quoted predicate values.
fn split_steps(rest: &str, expr: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for ch in rest.chars() {
        match ch {
            q @ ('\'' | '"') if depth > 0 => {
                match quote {
                    Some(open) if open == q => quote = None,
                    None => quote = Some(q),
                    Some(_) => {}
                }
                current.push(ch);
            }
            '[' if quote.is_none() => {
                depth += 1;
                current.push(ch);
            }
            ']' if quote.is_none() => {
                if depth == 0 {
                    return Err(malformed(expr, "unbalanced ']'"));
                }
                depth -= 1;
                current.push(ch);
            }
            '/' if depth == 0 && quote.is_none() => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(malformed(expr, "unbalanced '['"));
    }
    if quote.is_some() {
        return Err(malformed(expr, "unterminated quoted value"));
    }
    parts.push(current);
    if parts.iter().any(String::is_empty) {
        return Err(malformed(expr, "empty step"));
    }
    Ok(parts)
}

fn parse_step(part: &str, expr: &str) -> Result<Step> {
    let (name_part, preds_part) = match part.find('[') {
        Some(i) => (&part[..i], &part[i..]),
        None => (part, ""),
    };
    let target = if name_part == "*" {
        Target::Any
    } else {
        validate_name(name_part, expr)?;
        Target::Name(name_part.to_string())
    };
    let predicates = parse_predicates(preds_part, expr)?;
    Ok(Step { target, predicates })
}

fn parse_predicates(mut rest: &str, expr: &str) -> Result<Vec<Predicate>> {
    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let Some(stripped) = rest.strip_prefix('[') else {
            return Err(malformed(expr, "unexpected characters after predicate"));
        };
        // find the matching ']' (quote-aware; predicates do not nest)
        let mut quote: Option<char> = None;
        let mut end = None;
        for (i, ch) in stripped.char_indices() {
            match ch {
                q @ ('\'' | '"') => match quote {
                    Some(open) if open == q => quote = None,
                    None => quote = Some(q),
                    Some(_) => {}
                },
                ']' if quote.is_none() => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| malformed(expr, "unbalanced '['"))?;
        predicates.push(parse_predicate(&stripped[..end], expr)?);
        rest = &stripped[end + 1..];
    }
    Ok(predicates)
}

fn parse_predicate(pred: &str, expr: &str) -> Result<Predicate> {
    let pred = pred.trim();
    if pred.is_empty() {
        return Err(malformed(expr, "empty predicate"));
    }
    if pred.chars().all(|c| c.is_ascii_digit()) {
        let n: usize = pred
            .parse()
            .map_err(|_| malformed(expr, "invalid position predicate"))?;
        if n == 0 {
            return Err(malformed(expr, "positions are 1-based"));
        }
        return Ok(Predicate::Position(n));
    }
    if let Some(rest) = pred.strip_prefix('@') {
        let (name, value) = split_equals(rest, expr)?;
        validate_name(name, expr)?;
        return Ok(Predicate::AttrEquals(
            name.to_string(),
            parse_quoted(value, expr)?,
        ));
    }
    if let Some(rest) = pred.strip_prefix("text()") {
        let value = rest
            .trim_start()
            .strip_prefix('=')
            .ok_or_else(|| malformed(expr, "expected '=' after text()"))?;
        return Ok(Predicate::TextEquals(parse_quoted(value.trim(), expr)?));
    }
    Err(malformed(expr, "unsupported predicate"))
}

fn split_equals<'a>(s: &'a str, expr: &str) -> Result<(&'a str, &'a str)> {
    let i = s
        .find('=')
        .ok_or_else(|| malformed(expr, "expected '=' in predicate"))?;
    Ok((s[..i].trim(), s[i + 1..].trim()))
}

fn parse_quoted(s: &str, expr: &str) -> Result<String> {
    let mut chars = s.chars();
    let open = chars.next().ok_or_else(|| malformed(expr, "missing quoted value"))?;
    if open != '\'' && open != '"' {
        return Err(malformed(expr, "predicate value must be quoted"));
    }
    let rest: &str = chars.as_str();
    let inner = rest
        .strip_suffix(open)
        .ok_or_else(|| malformed(expr, "unterminated quoted value"))?;
    if inner.contains(open) {
        return Err(malformed(expr, "stray quote in predicate value"));
    }
    Ok(inner.to_string())
}

fn validate_name(name: &str, expr: &str) -> Result<()> {
    if name.is_empty() {
        return Err(malformed(expr, "empty name"));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
    {
        return Err(malformed(expr, &format!("invalid name '{name}'")));
    }
    Ok(())
}
