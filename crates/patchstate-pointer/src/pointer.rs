//! The normalized pointer address type.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::validate::{validate_json_pointer, validate_path};
use crate::{escape_component, format_json_pointer, parse_json_pointer, PointerError};

/// One unescaped pointer step: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment(String);

impl Segment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment(s.to_string())
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment(s)
    }
}

impl From<&String> for Segment {
    fn from(s: &String) -> Self {
        Segment(s.clone())
    }
}

macro_rules! segment_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Segment {
            fn from(i: $t) -> Self {
                Segment(i.to_string())
            }
        })*
    };
}

segment_from_int!(usize, u32, u64, i32, i64);

/// A normalized JSON Pointer.
///
/// The string form is always the re-formatted segment list, so two pointers
/// are equal iff their normalized strings are equal, and
/// `Pointer::of(p.segments()) == p` holds for every pointer.
#[derive(Clone)]
pub struct Pointer {
    raw: String,
    steps: Vec<String>,
}

impl Pointer {
    /// The root pointer `""`.
    pub fn root() -> Self {
        Pointer {
            raw: String::new(),
            steps: Vec::new(),
        }
    }

    /// Build a pointer from unescaped segments.
    pub fn of<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let steps: Vec<String> = segments
            .into_iter()
            .map(|s| s.into().into_string())
            .collect();
        Pointer {
            raw: format_json_pointer(&steps),
            steps,
        }
    }

    /// Parse and normalize a pointer string. A missing leading `/` is
    /// tolerated, and stray `~` characters are re-escaped.
    pub fn parse(pointer: &str) -> Self {
        Self::of(parse_json_pointer(pointer))
    }

    /// Strict parse: the pointer must be empty or start with `/`, and stay
    /// within the length limits.
    pub fn try_parse(pointer: &str) -> Result<Self, PointerError> {
        validate_json_pointer(pointer)?;
        let pointer = Self::parse(pointer);
        validate_path(&pointer.steps)?;
        Ok(pointer)
    }

    /// A new pointer whose segments are `self.segments() ++ segments`.
    pub fn extend<I, S>(&self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let mut out = self.clone();
        for segment in segments {
            let step = segment.into().into_string();
            out.raw.push('/');
            out.raw.push_str(&escape_component(&step));
            out.steps.push(step);
        }
        out
    }

    /// Shorthand for extending by a single segment.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        self.extend([segment])
    }

    pub fn segments(&self) -> &[String] {
        &self.steps
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The last segment, `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }

    /// The pointer one level up.
    ///
    /// # Errors
    ///
    /// Returns [`PointerError::NoParent`] for the root.
    pub fn parent(&self) -> Result<Pointer, PointerError> {
        match self.steps.split_last() {
            Some((_, init)) => Ok(Pointer::of(init)),
            None => Err(PointerError::NoParent),
        }
    }
}

impl Default for Pointer {
    fn default() -> Self {
        Pointer::root()
    }
}

impl PartialEq for Pointer {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Pointer {}

impl Hash for Pointer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Debug for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointer({:?})", self.raw)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Pointer {
    type Err = PointerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pointer::try_parse(s)
    }
}

impl From<&str> for Pointer {
    fn from(s: &str) -> Self {
        Pointer::parse(s)
    }
}

impl From<String> for Pointer {
    fn from(s: String) -> Self {
        Pointer::parse(&s)
    }
}

impl From<&Pointer> for Pointer {
    fn from(p: &Pointer) -> Self {
        p.clone()
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Pointer::parse(&raw))
    }
}
