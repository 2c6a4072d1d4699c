//! Named-field access for elements stored in a [`TagMap`](crate::TagMap).
//!
//! The map never inspects element memory directly; everything it needs goes
//! through [`Record`]: reading a field's stringified value for indexing,
//! writing a field through [`TagMap::set`](crate::TagMap::set), and holding
//! the identity integer the map assigns on first insertion.

use alloc::borrow::Cow;
use alloc::string::String;

use hashbrown::HashMap;

/// An element with named, string-renderable fields and an identity slot.
///
/// Implementations back two pieces of [`TagMap`](crate::TagMap) behavior:
///
/// - **Indexing.** `field` returns the stringified value of a named field, or
///   `None` when the record has no such field. A record returning `None` for
///   a declared key simply does not appear in that key's index.
/// - **Identity.** The map assigns each element a unique integer on first
///   insertion, calling [`set_ident`](Record::set_ident) only while
///   [`ident`](Record::ident) is `None`. Implementations must store the value
///   and keep returning it; the map never reassigns it, so the identity
///   survives removal and reinsertion of the same element.
pub trait Record {
    /// Returns the stringified value of the named field, if present.
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;

    /// Overwrites the named field, creating it if absent.
    fn put_field(&mut self, name: &str, value: &str);

    /// The identity assigned by a map, if one has been assigned yet.
    fn ident(&self) -> Option<u64>;

    /// Stores the map-assigned identity. Called at most once per element.
    fn set_ident(&mut self, ident: u64);
}

/// A ready-made string-field [`Record`].
///
/// Fields live in a `hashbrown` map of `String` to `String`; the identity
/// slot is a plain `Option<u64>`. Handy for tests and for callers that don't
/// need a bespoke element type.
///
/// # Examples
///
/// ```
/// use tagmap::{Record, Row};
///
/// let mut row = Row::new().with("name", "torch").with("weight", "1");
/// assert_eq!(row.get("name"), Some("torch"));
/// assert_eq!(row.get("owner"), None);
///
/// row.put_field("weight", "2");
/// assert_eq!(row.get("weight"), Some("2"));
/// assert_eq!(row.ident(), None); // not yet managed by a map
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Row {
    ident: Option<u64>,
    fields: HashMap<String, String>,
}

impl Row {
    /// Creates an empty row with no fields and no identity.
    #[inline]
    pub fn new() -> Self {
        Self { ident: None, fields: HashMap::new() }
    }

    /// Builder-style field setter.
    #[inline]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the named field's value, if present.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Removes the named field, returning its prior value.
    #[inline]
    pub fn unset(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    /// Number of fields currently set.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Record for Row {
    #[cfg_attr(feature = "inline-more", inline)]
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.fields.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }

    #[cfg_attr(feature = "inline-more", inline)]
    fn put_field(&mut self, name: &str, value: &str) {
        self.fields.insert(String::from(name), String::from(value));
    }

    #[inline(always)]
    fn ident(&self) -> Option<u64> {
        self.ident
    }

    #[inline(always)]
    fn set_ident(&mut self, ident: u64) {
        self.ident = Some(ident);
    }
}
