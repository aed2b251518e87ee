//! Member paths such as `Items[0].Name` and the host-owned cache that interns them.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::foundation::error::{BindError, BindResult};
use crate::foundation::sync::lock;
use crate::foundation::value::Value;
use crate::members::descriptor::INDEXER_CHANGED;

#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Member(Arc<str>),
    /// Integer or string literal arguments.
    Index(Vec<Value>),
}

impl PathSegment {
    /// Name raised when this segment's value changes.
    pub fn notification_name(&self) -> &str {
        match self {
            Self::Member(name) => name,
            Self::Index(_) => INDEXER_CHANGED,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(name) => f.write_str(name),
            Self::Index(args) => {
                f.write_str("[")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    match arg {
                        Value::String(s) => write!(f, "\"{s}\"")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("]")
            }
        }
    }
}

/// An immutable parsed path. Zero segments is the self path.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPath {
    text: Arc<str>,
    segments: Vec<PathSegment>,
}

impl MemberPath {
    pub fn parse(text: &str) -> BindResult<Self> {
        let segments = split(text)?;
        Ok(Self {
            text: Arc::from(text),
            segments,
        })
    }

    pub fn empty() -> Self {
        Self {
            text: Arc::from(""),
            segments: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&PathSegment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn malformed(text: &str, at: usize, why: &str) -> BindError {
    BindError::parse(format!("malformed member path '{text}' at {at}: {why}"))
}

fn split(text: &str) -> BindResult<Vec<PathSegment>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Ok(Vec::new());
    }
    let chars: Vec<char> = trimmed.chars().collect();
    let mut segments = Vec::new();
    let mut name = String::new();
    let mut i = 0;
    let mut after_dot = false;
    // A name directly after `]` needs a dot first.
    let mut after_index = false;

    let flush = |name: &mut String, segments: &mut Vec<PathSegment>| {
        if !name.is_empty() {
            segments.push(PathSegment::Member(Arc::from(name.trim())));
            name.clear();
        }
    };

    while i < chars.len() {
        match chars[i] {
            '.' => {
                if name.trim().is_empty() && segments.is_empty() {
                    return Err(malformed(text, i, "leading '.'"));
                }
                if after_dot {
                    return Err(malformed(text, i, "empty segment"));
                }
                flush(&mut name, &mut segments);
                after_dot = true;
                after_index = false;
                i += 1;
            }
            '[' => {
                if after_dot {
                    return Err(malformed(text, i, "'[' after '.'"));
                }
                flush(&mut name, &mut segments);
                let (args, end) = read_index(text, &chars, i)?;
                segments.push(PathSegment::Index(args));
                after_index = true;
                i = end;
            }
            ']' => return Err(malformed(text, i, "unbalanced ']'")),
            c if c.is_alphanumeric() || c == '_' => {
                if after_index {
                    return Err(malformed(text, i, "missing '.' after ']'"));
                }
                name.push(c);
                after_dot = false;
                i += 1;
            }
            c if c.is_whitespace() && name.is_empty() => i += 1,
            c => return Err(malformed(text, i, &format!("unexpected '{c}'"))),
        }
    }
    if after_dot {
        return Err(malformed(text, chars.len(), "trailing '.'"));
    }
    flush(&mut name, &mut segments);
    Ok(segments)
}

/// Reads `[...]` starting at `open`; returns the arguments and the index after `]`.
fn read_index(text: &str, chars: &[char], open: usize) -> BindResult<(Vec<Value>, usize)> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut quoted = false;
    let mut depth = 0usize;
    let mut i = open + 1;
    while i < chars.len() {
        let c = chars[i];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '\'' | '"' => {
                    if quoted || !current.trim().is_empty() {
                        return Err(malformed(text, i, "stray quote"));
                    }
                    quote = Some(c);
                    quoted = true;
                }
                '[' => {
                    depth += 1;
                    current.push(c);
                }
                ']' if depth > 0 => {
                    depth -= 1;
                    current.push(c);
                }
                ']' | ',' => {
                    args.push(index_arg(text, i, &current, quoted)?);
                    current.clear();
                    quoted = false;
                    if c == ']' {
                        return Ok((args, i + 1));
                    }
                }
                c if quoted && !c.is_whitespace() => {
                    return Err(malformed(text, i, "text after a quoted index"));
                }
                c => current.push(c),
            },
        }
        i += 1;
    }
    Err(malformed(text, open, "unterminated '['"))
}

fn index_arg(text: &str, at: usize, raw: &str, quoted: bool) -> BindResult<Value> {
    if quoted {
        return Ok(Value::from(raw));
    }
    let raw = raw.trim();
    let parsed: i64 = raw
        .parse()
        .map_err(|_| malformed(text, at, &format!("index '{raw}' is not an integer or string")))?;
    Ok(match i32::try_from(parsed) {
        Ok(small) => Value::Int(small),
        Err(_) => Value::Long(parsed),
    })
}

/// Interns parsed paths by text. Owned by the host; entries live until [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct MemberPathCache {
    paths: Mutex<HashMap<Arc<str>, Arc<MemberPath>>>,
}

impl MemberPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached path for `text`, parsing it on first use. Malformed text is not cached.
    pub fn get(&self, text: &str) -> BindResult<Arc<MemberPath>> {
        if let Some(hit) = lock(&self.paths).get(text) {
            return Ok(Arc::clone(hit));
        }
        let path = Arc::new(MemberPath::parse(text)?);
        let mut paths = lock(&self.paths);
        let entry = paths
            .entry(Arc::clone(&path.text))
            .or_insert_with(|| Arc::clone(&path));
        Ok(Arc::clone(entry))
    }

    pub fn clear(&self) {
        lock(&self.paths).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.paths).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/observation/path.rs"]
mod tests;
