//! In-memory PDF object model.
//!
//! Values are owned trees; indirect references stay as [`ObjectRef`] ids and
//! are resolved through [`ObjectGraph`](crate::document::ObjectGraph).

use std::collections::BTreeMap;
use std::fmt;

/// Identifier of an indirect object: object number and generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    pub id: u32,
    pub generation: u16,
}

impl ObjectRef {
    pub fn new(id: u32, generation: u16) -> Self {
        Self { id, generation }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.id, self.generation)
    }
}

/// A PDF dictionary. Keys are names without the leading `/`.
///
/// Backed by an ordered map so iteration is deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary(BTreeMap<String, PdfValue>);

impl Dictionary {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&PdfValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PdfValue) -> Option<PdfValue> {
        self.0.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PdfValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The value under `key` when it is a direct name.
    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PdfValue::as_name)
    }

    /// `/Type` of the dictionary, if present as a name.
    pub fn type_name(&self) -> Option<&str> {
        self.get_name("Type")
    }
}

impl FromIterator<(String, PdfValue)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (String, PdfValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Dictionary {
    type Item = (String, PdfValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, PdfValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A stream object: its dictionary and the raw (still encoded) payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    pub dict: Dictionary,
    pub data: Vec<u8>,
}

/// A parsed PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// Literal or hex string, as raw bytes.
    String(Vec<u8>),
    /// Name without the leading `/`, `#xx` escapes decoded.
    Name(String),
    Array(Vec<PdfValue>),
    Dictionary(Dictionary),
    Reference(ObjectRef),
    Stream(PdfStream),
}

impl PdfValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PdfValue::Integer(n) => Some(*n),
            PdfValue::Real(r) if r.fract() == 0.0 => Some(*r as i64),
            _ => None,
        }
    }

    /// Numeric value of an Integer or Real.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PdfValue::Integer(n) => Some(*n as f64),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfValue::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PdfValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfValue]> {
        match self {
            PdfValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The dictionary of a Dictionary value or of a Stream.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PdfValue::Dictionary(d) => Some(d),
            PdfValue::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&PdfStream> {
        match self {
            PdfValue::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            PdfValue::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PdfValue::Null)
    }

    /// Short type label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            PdfValue::Null => "null",
            PdfValue::Boolean(_) => "boolean",
            PdfValue::Integer(_) => "integer",
            PdfValue::Real(_) => "real",
            PdfValue::String(_) => "string",
            PdfValue::Name(_) => "name",
            PdfValue::Array(_) => "array",
            PdfValue::Dictionary(_) => "dictionary",
            PdfValue::Reference(_) => "reference",
            PdfValue::Stream(_) => "stream",
        }
    }
}
