//! Slash-separated data paths with list-key predicates.
//!
//! Grammar: `/segment/segment[key=value][key2=value2]/leaf`. Predicate
//! values run to the closing bracket and are compared against the canonical
//! text form of key leaves; quoting is not needed because `]` cannot occur
//! in YANG identifiers or canonical scalar forms this engine emits.

use crate::error::{ParseError, ParseResult};
use std::fmt;
use std::str::FromStr;

/// One path segment: a node name plus optional key predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    /// Node name, optionally `module:local`.
    pub name: String,
    /// Key predicates, in written order.
    pub predicates: Vec<(String, String)>,
}

impl Segment {
    /// Creates a predicate-free segment.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            predicates: Vec::new(),
        }
    }

    /// Creates a segment with a single key predicate.
    #[must_use]
    pub fn keyed(name: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            predicates: vec![(key.into(), value.into())],
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (key, value) in &self.predicates {
            write!(f, "[{key}={value}]")?;
        }
        Ok(())
    }
}

/// An absolute data path.
///
/// The empty path (`/` or the empty string) addresses the whole tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path {
    /// Segments from the root down.
    pub segments: Vec<Segment>,
}

impl Path {
    /// The root path, addressing the entire tree.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from segments.
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// True if this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path of this path's parent, or `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<Path> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Path::new(self.segments[..self.segments.len() - 1].to_vec()))
    }

    /// The final segment, or `None` at the root.
    #[must_use]
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The predicate-free schema form of the path (`/interfaces/interface/name`).
    ///
    /// This is the form schema lookups key on: predicates select instances,
    /// not schema nodes.
    #[must_use]
    pub fn schema_path(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            out.push_str(&segment.name);
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Ok(Self::root());
        }
        let body = trimmed
            .strip_prefix('/')
            .ok_or_else(|| ParseError::invalid_path(s, "path must start with '/'"))?;

        let mut segments = Vec::new();
        for raw in split_segments(body) {
            segments.push(parse_segment(s, &raw)?);
        }
        Ok(Self { segments })
    }
}

/// Splits on `/` outside predicate brackets.
fn split_segments(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for ch in body.chars() {
        match ch {
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            '/' if depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    out.push(current);
    out
}

fn parse_segment(full: &str, raw: &str) -> ParseResult<Segment> {
    let bracket = raw.find('[');
    let (name, rest) = match bracket {
        Some(idx) => (&raw[..idx], &raw[idx..]),
        None => (raw, ""),
    };
    if name.is_empty() {
        return Err(ParseError::invalid_path(full, "empty path segment"));
    }
    if name.contains(']') || name.contains('=') {
        return Err(ParseError::invalid_path(full, "malformed segment name"));
    }

    let mut predicates = Vec::new();
    let mut remaining = rest;
    while !remaining.is_empty() {
        let inner = remaining
            .strip_prefix('[')
            .and_then(|r| r.split_once(']'))
            .ok_or_else(|| ParseError::invalid_path(full, "unterminated predicate"))?;
        let (pred, tail) = inner;
        let (key, value) = pred
            .split_once('=')
            .ok_or_else(|| ParseError::invalid_path(full, "predicate missing '='"))?;
        if key.is_empty() {
            return Err(ParseError::invalid_path(full, "predicate missing key name"));
        }
        predicates.push((key.to_string(), value.to_string()));
        remaining = tail;
    }

    Ok(Segment {
        name: name.to_string(),
        predicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_path() {
        let path: Path = "/system/hostname".parse().unwrap();
        assert_eq!(path.segments.len(), 2);
        assert_eq!(path.segments[1].name, "hostname");
        assert_eq!(path.to_string(), "/system/hostname");
    }

    #[test]
    fn parses_predicates() {
        let path: Path = "/interfaces/interface[name=eth0]/enabled".parse().unwrap();
        assert_eq!(
            path.segments[1].predicates,
            vec![("name".to_string(), "eth0".to_string())]
        );
        assert_eq!(path.to_string(), "/interfaces/interface[name=eth0]/enabled");
    }

    #[test]
    fn parses_multiple_predicates() {
        let path: Path = "/routes/route[prefix=10.0.0.0/8][table=main]"
            .parse()
            .unwrap();
        assert_eq!(path.segments[1].predicates.len(), 2);
        assert_eq!(path.segments[1].predicates[0].1, "10.0.0.0/8");
    }

    #[test]
    fn root_forms() {
        assert!("/".parse::<Path>().unwrap().is_root());
        assert!("".parse::<Path>().unwrap().is_root());
        assert_eq!(Path::root().to_string(), "/");
    }

    #[test]
    fn rejects_malformed() {
        assert!("system".parse::<Path>().is_err());
        assert!("/a//b".parse::<Path>().is_err());
        assert!("/a[key".parse::<Path>().is_err());
        assert!("/a[nokey]".parse::<Path>().is_err());
    }

    #[test]
    fn schema_path_strips_predicates() {
        let path: Path = "/interfaces/interface[name=eth0]/mtu".parse().unwrap();
        assert_eq!(path.schema_path(), "/interfaces/interface/mtu");
    }

    #[test]
    fn parent_and_last() {
        let path: Path = "/a/b/c".parse().unwrap();
        assert_eq!(path.parent().unwrap().to_string(), "/a/b");
        assert_eq!(path.last().unwrap().name, "c");
        assert!(Path::root().parent().is_none());
    }
}
