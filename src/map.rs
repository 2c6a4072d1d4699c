//! The core container: an insertion-ordered, multi-indexed map of
//! [`Record`] elements addressed by string tags.
//!
//! [`TagMap`] keeps three structures consistent on every mutation:
//!
//! - an **order list** of tags, defining enumeration and positional access;
//! - a **primary table** mapping each tag to the element it owns;
//! - one **key index** per field name declared at construction, mapping each
//!   stringified field value to the tags of the elements holding it, in
//!   insertion order.
//!
//! There is no background reconciliation: an operation either completes with
//! all three structures updated or fails with none of them touched.

use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use core::slice;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::record::Record;

/// A unique element identifier within a [`TagMap`].
///
/// Tags are plain strings; auto-generated tags are decimal renderings of a
/// per-map counter. `Tag` borrows as `str`, so every lookup method takes
/// `&str` and `Tag` values compare directly against string literals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(Box<str>);

impl Tag {
    /// The tag as a string slice.
    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Tag {
    #[inline(always)]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Tag {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Box::from(s))
    }
}

impl From<String> for Tag {
    #[inline]
    fn from(s: String) -> Self {
        Self(s.into_boxed_str())
    }
}

impl From<u64> for Tag {
    #[inline]
    fn from(n: u64) -> Self {
        Self(n.to_string().into_boxed_str())
    }
}

impl PartialEq<str> for Tag {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Tag {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Tag {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One secondary index: stringified field value -> tags in insertion order.
///
/// Buckets are dropped as soon as they empty, so `buckets` only ever holds
/// values some live element currently carries.
#[derive(Debug, Clone)]
struct KeyIndex {
    name: String,
    buckets: HashMap<String, Vec<Tag>>,
}

impl KeyIndex {
    fn detach(&mut self, value: &str, tag: &str) {
        if let Some(bucket) = self.buckets.get_mut(value) {
            if let Some(pos) = bucket.iter().position(|t| t.as_str() == tag) {
                bucket.remove(pos);
            }
            if bucket.is_empty() {
                self.buckets.remove(value);
            }
        }
    }
}

/// An insertion-ordered map of tagged elements with secondary field indexes.
///
/// Elements are owned by the map and addressed by a unique string [`Tag`],
/// either caller-supplied or auto-generated from a per-map counter. Field
/// names declared at construction are indexed for the map's lifetime:
/// [`get_where`](TagMap::get_where) returns all elements sharing a value for
/// a declared key, in insertion order, without scanning.
///
/// On first insertion each element is assigned a unique, strictly increasing
/// identity through [`Record::set_ident`]; the identity is never reassigned,
/// even across removal and reinsertion of the same element.
///
/// # Caller obligation
///
/// Changing a *declared key field* on a managed element must go through
/// [`set`](TagMap::set); mutating one directly (e.g. via
/// [`get_mut`](TagMap::get_mut)) silently desynchronizes that key's index
/// from the element. Non-key fields may be mutated freely either way.
///
/// # Examples
///
/// ```
/// use tagmap::{Row, TagMap};
///
/// let mut m = TagMap::with_keys(["kind"]);
/// m.insert("door", Row::new().with("kind", "fixture")).unwrap();
/// m.insert("rat", Row::new().with("kind", "monster")).unwrap();
/// m.insert("bat", Row::new().with("kind", "monster")).unwrap();
///
/// let monsters: Vec<_> = m.get_where("kind", "monster").collect();
/// assert_eq!(monsters.len(), 2);
/// assert_eq!(m.get_index(0).unwrap().get("kind"), Some("fixture"));
/// ```
pub struct TagMap<T> {
    order: Vec<Tag>,
    primary: HashMap<Tag, T>,
    indexes: Vec<KeyIndex>,

    // per-instance monotonic counters, advanced only by insertion
    next_tag: u64,
    next_ident: u64,
}

impl<T> TagMap<T> {
    /// Creates an empty map with no declared keys.
    #[inline]
    pub fn new() -> Self {
        Self::with_keys::<_, String>([])
    }

    /// Creates an empty map indexing the given field names.
    ///
    /// The key set is fixed for the map's lifetime; duplicate names are
    /// ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::{Row, TagMap};
    ///
    /// let m: TagMap<Row> = TagMap::with_keys(["kind", "zone"]);
    /// assert!(m.is_key("kind"));
    /// assert!(!m.is_key("name"));
    /// ```
    pub fn with_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut indexes = Vec::<KeyIndex>::new();
        for key in keys {
            let name = key.into();
            if indexes.iter().any(|ki| ki.name == name) {
                continue;
            }
            indexes.push(KeyIndex { name, buckets: HashMap::new() });
        }
        Self {
            order: Vec::new(),
            primary: HashMap::new(),
            indexes,
            next_tag: 0,
            next_ident: 0,
        }
    }

    /// Number of managed elements.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if the map manages no elements.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The declared key names, in declaration order.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.indexes.iter().map(|ki| ki.name.as_str())
    }

    /// Returns `true` if `name` is a declared key.
    #[inline]
    pub fn is_key(&self, name: &str) -> bool {
        self.indexes.iter().any(|ki| ki.name == name)
    }

    /// Returns `true` if an element is managed under `tag`.
    #[inline]
    pub fn contains(&self, tag: &str) -> bool {
        self.primary.contains_key(tag)
    }

    /// Returns a reference to the element at `tag`, if any.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn get(&self, tag: &str) -> Option<&T> {
        self.primary.get(tag)
    }

    /// Returns a mutable reference to the element at `tag`, if any.
    ///
    /// See the [caller obligation](TagMap#caller-obligation): do not change
    /// declared key fields through this reference.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn get_mut(&mut self, tag: &str) -> Option<&mut T> {
        self.primary.get_mut(tag)
    }

    /// Returns the element at position `index` of the order list.
    ///
    /// Out-of-range indexes yield `None`.
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn get_index(&self, index: usize) -> Option<&T> {
        let tag = self.order.get(index)?;
        self.primary.get(tag.as_str())
    }

    /// Returns the tag at position `index` of the order list.
    #[inline]
    pub fn tag_at(&self, index: usize) -> Option<&Tag> {
        self.order.get(index)
    }

    /// Returns the order-list position of `tag`, if managed. O(n).
    #[inline]
    pub fn position(&self, tag: &str) -> Option<usize> {
        self.order.iter().position(|t| t.as_str() == tag)
    }

    /// All elements whose declared key `key` currently holds `value`, in
    /// insertion order.
    ///
    /// Unknown keys and unindexed values yield an empty iterator. As a
    /// special case, `key == "tag"` performs a primary lookup of `value`
    /// instead, yielding at most one element.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::{Row, TagMap};
    ///
    /// let mut m = TagMap::with_keys(["zone"]);
    /// m.insert("a", Row::new().with("zone", "cave")).unwrap();
    /// m.insert("b", Row::new().with("zone", "cave")).unwrap();
    ///
    /// assert_eq!(m.get_where("zone", "cave").len(), 2);
    /// assert_eq!(m.get_where("zone", "swamp").len(), 0);
    /// assert_eq!(m.get_where("tag", "b").len(), 1);
    /// ```
    pub fn get_where(&self, key: &str, value: &str) -> Matches<'_, T> {
        if key == "tag" {
            return Matches {
                direct: self.primary.get(value),
                tags: &[],
                primary: &self.primary,
            };
        }
        let bucket = self
            .indexes
            .iter()
            .find(|ki| ki.name == key)
            .and_then(|ki| ki.buckets.get(value));
        let tags = match bucket {
            Some(bucket) => bucket.as_slice(),
            None => &[],
        };
        Matches { direct: None, tags, primary: &self.primary }
    }

    /// First element of [`get_where`](TagMap::get_where)'s result, if any.
    #[inline]
    pub fn get_first_where(&self, key: &str, value: &str) -> Option<&T> {
        self.get_where(key, value).next()
    }

    /// Iterates `(tag, element)` pairs in order-list order.
    ///
    /// Pair with [`Iterator::enumerate`] when the position is also needed.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { order: self.order.iter(), primary: &self.primary }
    }

    /// Iterates tags in order-list order.
    #[inline]
    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.order.iter()
    }

    /// Iterates elements in order-list order.
    #[inline]
    pub fn elements(&self) -> impl Iterator<Item = &T> {
        self.iter().map(|(_, element)| element)
    }

    /// Reserves capacity for at least `additional` more elements in the
    /// order list and primary table.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.order.reserve(additional);
        self.primary.reserve(additional);
    }

    /// Removes every element, keeping declared keys and both counters.
    ///
    /// Tags and identities are never reused, so clearing does not reset the
    /// generators.
    pub fn clear(&mut self) {
        self.order.clear();
        self.primary.clear();
        for ki in &mut self.indexes {
            ki.buckets.clear();
        }
    }

    /// Builds a new map by applying `f` to every element in order.
    ///
    /// The new map declares `keys` as its indexed fields and receives one
    /// output element per input element, under the same tag and at the same
    /// position. `f` is given the tag, the element, and its position.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::{Row, TagMap};
    ///
    /// let mut m = TagMap::with_keys(["kind"]);
    /// m.insert("rat", Row::new().with("kind", "monster")).unwrap();
    /// m.insert("bat", Row::new().with("kind", "monster")).unwrap();
    ///
    /// let sized = m.transform(["size"], |_, row, index| {
    ///     let size = if index == 0 { "small" } else { "tiny" };
    ///     row.clone().with("size", size)
    /// });
    /// assert_eq!(sized.len(), 2);
    /// assert_eq!(sized.get_where("size", "tiny").len(), 1);
    /// assert!(sized.contains("rat"));
    /// ```
    pub fn transform<U, I, S, F>(&self, keys: I, mut f: F) -> TagMap<U>
    where
        U: Record,
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(&Tag, &T, usize) -> U,
    {
        let mut out = TagMap::with_keys(keys);
        out.reserve(self.len());
        for (index, (tag, element)) in self.iter().enumerate() {
            // tags are unique here, so reinsertion under them cannot fail
            let _ = out.insert_inner(Some(tag.clone()), index, f(tag, element, index));
        }
        out
    }
}

impl<T: Record> TagMap<T> {
    /// Appends `element` under an auto-generated tag.
    ///
    /// Returns the tag on success. Fails only if a caller-supplied tag
    /// already occupies the generated value; the generator is consumed
    /// either way, and on failure the element is handed back untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::{Row, TagMap};
    ///
    /// let mut m: TagMap<Row> = TagMap::new();
    /// let first = m.push(Row::new()).unwrap();
    /// let second = m.push(Row::new()).unwrap();
    /// assert_eq!(first.as_str(), "0");
    /// assert_eq!(second.as_str(), "1");
    /// ```
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn push(&mut self, element: T) -> Result<Tag, T> {
        let end = self.order.len();
        self.insert_inner(None, end, element)
    }

    /// Inserts `element` under an auto-generated tag at order position
    /// `index` (clamped to the current length).
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn push_at(&mut self, index: usize, element: T) -> Result<Tag, T> {
        self.insert_inner(None, index, element)
    }

    /// Prepends `element` under an auto-generated tag.
    #[inline]
    pub fn push_front(&mut self, element: T) -> Result<Tag, T> {
        self.insert_inner(None, 0, element)
    }

    /// Appends `element` under `tag`.
    ///
    /// Fails if an element already occupies `tag`, handing the element back
    /// as `Err` with the map unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::{Row, TagMap};
    ///
    /// let mut m: TagMap<Row> = TagMap::new();
    /// assert!(m.insert("hero", Row::new()).is_ok());
    /// assert!(m.insert("hero", Row::new()).is_err());
    /// assert_eq!(m.len(), 1);
    /// ```
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn insert(&mut self, tag: impl Into<Tag>, element: T) -> Result<Tag, T> {
        let end = self.order.len();
        self.insert_inner(Some(tag.into()), end, element)
    }

    /// Inserts `element` under `tag` at order position `index` (clamped to
    /// the current length). Positional insertion shifts later elements and
    /// is O(n).
    #[cfg_attr(feature = "inline-more", inline)]
    pub fn insert_at(&mut self, index: usize, tag: impl Into<Tag>, element: T) -> Result<Tag, T> {
        self.insert_inner(Some(tag.into()), index, element)
    }

    /// Prepends `element` under `tag`; equivalent to
    /// [`insert_at(0, ..)`](TagMap::insert_at).
    #[inline]
    pub fn insert_front(&mut self, tag: impl Into<Tag>, element: T) -> Result<Tag, T> {
        self.insert_inner(Some(tag.into()), 0, element)
    }

    /// Removes the element at `tag`, handing it back to the caller.
    ///
    /// The element is purged from the order list, the primary table, and
    /// every key bucket it occupies; buckets left empty are dropped. Returns
    /// `None` (no mutation) if `tag` is not managed.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::{Record, Row, TagMap};
    ///
    /// let mut m = TagMap::with_keys(["kind"]);
    /// m.insert("rat", Row::new().with("kind", "monster")).unwrap();
    ///
    /// let rat = m.remove("rat").unwrap();
    /// assert!(rat.ident().is_some()); // identity stays with the element
    /// assert!(m.is_empty());
    /// assert_eq!(m.get_where("kind", "monster").len(), 0);
    /// assert_eq!(m.remove("rat"), None);
    /// ```
    pub fn remove(&mut self, tag: &str) -> Option<T> {
        let element = self.primary.remove(tag)?;
        if let Some(pos) = self.order.iter().position(|t| t.as_str() == tag) {
            self.order.remove(pos);
        }
        for ki in &mut self.indexes {
            if let Some(value) = element.field(&ki.name) {
                ki.detach(value.as_ref(), tag);
            }
        }
        Some(element)
    }

    /// Sets field `field` of the element at `tag` to `value`.
    ///
    /// For a non-key field this writes through to the element in O(1). For a
    /// declared key it detaches the element from all structures, applies the
    /// write, and reattaches it under the same tag at its original order
    /// position, so every key index reflects the new value. Returns `false`
    /// (no mutation) if `tag` is not managed.
    ///
    /// # Examples
    ///
    /// ```
    /// use tagmap::{Row, TagMap};
    ///
    /// let mut m = TagMap::with_keys(["zone"]);
    /// m.insert("a", Row::new().with("zone", "cave")).unwrap();
    /// m.insert("b", Row::new().with("zone", "cave")).unwrap();
    ///
    /// assert!(m.set("a", "zone", "swamp"));
    /// assert_eq!(m.get_where("zone", "cave").len(), 1);
    /// assert_eq!(m.get_where("zone", "swamp").len(), 1);
    /// assert_eq!(m.position("a"), Some(0)); // order preserved
    /// ```
    pub fn set(&mut self, tag: &str, field: &str, value: &str) -> bool {
        if !self.is_key(field) {
            return match self.primary.get_mut(tag) {
                Some(element) => {
                    element.put_field(field, value);
                    true
                }
                None => false,
            };
        }

        let pos = match self.position(tag) {
            Some(pos) => pos,
            None => return false,
        };
        let owned = self.order[pos].clone();
        let mut element = match self.remove(tag) {
            Some(element) => element,
            None => return false,
        };
        element.put_field(field, value);
        // the removal above freed the tag, so reattachment cannot collide
        self.insert_inner(Some(owned), pos, element).is_ok()
    }

    /// Single insertion path backing every public insert variant.
    ///
    /// Validation happens strictly before any mutation: a duplicate tag
    /// returns the element untouched, with no identity assigned and no
    /// structure changed. An auto-generated tag consumes the counter even
    /// when it then collides with a caller-supplied tag.
    fn insert_inner(&mut self, tag: Option<Tag>, index: usize, mut element: T) -> Result<Tag, T> {
        let tag = match tag {
            Some(tag) => tag,
            None => {
                let tag = Tag::from(self.next_tag);
                self.next_tag += 1;
                tag
            }
        };
        if self.primary.contains_key(&tag) {
            return Err(element);
        }

        if element.ident().is_none() {
            element.set_ident(self.next_ident);
            self.next_ident += 1;
        }

        let index = index.min(self.order.len());
        self.order.insert(index, tag.clone());
        for ki in &mut self.indexes {
            if let Some(value) = element.field(&ki.name) {
                ki.buckets.entry_ref(value.as_ref()).or_default().push(tag.clone());
            }
        }
        self.primary.insert(tag.clone(), element);
        Ok(tag)
    }
}

/// Borrowing iterator over `(tag, element)` pairs in order-list order.
#[derive(Debug)]
pub struct Iter<'a, T> {
    order: slice::Iter<'a, Tag>,
    primary: &'a HashMap<Tag, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (&'a Tag, &'a T);

    #[cfg_attr(feature = "inline-more", inline)]
    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.order.next()?;
        Some((tag, self.primary.get(tag.as_str()).unwrap()))
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.order.len()
    }
}

impl<T> FusedIterator for Iter<'_, T> {}

/// Borrowing iterator over the elements matching a key/value query, in
/// insertion order. Returned by [`TagMap::get_where`].
#[derive(Debug)]
pub struct Matches<'a, T> {
    direct: Option<&'a T>,
    tags: &'a [Tag],
    primary: &'a HashMap<Tag, T>,
}

impl<'a, T> Iterator for Matches<'a, T> {
    type Item = &'a T;

    #[cfg_attr(feature = "inline-more", inline)]
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(element) = self.direct.take() {
            return Some(element);
        }
        let (tag, rest) = self.tags.split_first()?;
        self.tags = rest;
        Some(self.primary.get(tag.as_str()).unwrap())
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.tags.len() + usize::from(self.direct.is_some());
        (n, Some(n))
    }
}

impl<T> ExactSizeIterator for Matches<'_, T> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.tags.len() + usize::from(self.direct.is_some())
    }
}

impl<T> FusedIterator for Matches<'_, T> {}

impl<'a, T> IntoIterator for &'a TagMap<T> {
    type Item = (&'a Tag, &'a T);
    type IntoIter = Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Default for TagMap<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for TagMap<T> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
            primary: self.primary.clone(),
            indexes: self.indexes.clone(),
            next_tag: self.next_tag,
            next_ident: self.next_ident,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TagMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(tag, element)| (tag.as_str(), element)))
            .finish()
    }
}

impl<T: PartialEq> PartialEq for TagMap<T> {
    /// Equality considers the declared key set, the tag sequence, and the
    /// elements, in order. Counter state is ignored.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if !self.keys().eq(other.keys()) {
            return false;
        }
        self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for TagMap<T> {}

impl<T: Record> FromIterator<T> for TagMap<T> {
    #[cfg_attr(feature = "inline-more", inline)]
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut map = TagMap::new();
        map.extend(iter);
        map
    }
}

impl<T: Record> Extend<T> for TagMap<T> {
    #[cfg_attr(feature = "inline-more", inline)]
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        // fresh auto tags cannot collide with previous auto tags
        iter.for_each(|element| _ = self.push(element));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Row;

    use alloc::format;
    use alloc::vec;
    use alloc::vec::Vec;

    fn kinded(kind: &str) -> Row {
        Row::new().with("kind", kind)
    }

    #[test]
    fn test_new_and_default_and_with_keys() {
        let a: TagMap<Row> = TagMap::new();
        assert!(a.is_empty());
        assert_eq!(a.keys().count(), 0);

        let b: TagMap<Row> = TagMap::default();
        assert!(b.is_empty());

        let c: TagMap<Row> = TagMap::with_keys(["kind", "zone", "kind"]);
        assert_eq!(c.keys().collect::<Vec<_>>(), vec!["kind", "zone"]);
        assert!(c.is_key("zone"));
        assert!(!c.is_key("tag"));
    }

    #[test]
    fn test_auto_tags_are_monotonic_decimal() {
        let mut m: TagMap<Row> = TagMap::new();
        assert_eq!(m.push(Row::new()).unwrap(), "0");
        assert_eq!(m.push(Row::new()).unwrap(), "1");
        m.remove("0").unwrap();
        // removal never recycles the generator
        assert_eq!(m.push(Row::new()).unwrap(), "2");
    }

    #[test]
    fn test_auto_tag_collides_with_caller_tag() {
        let mut m: TagMap<Row> = TagMap::new();
        m.insert("0", Row::new()).unwrap();
        // the generator yields "0", which is occupied; the counter is
        // consumed regardless
        assert!(m.push(Row::new()).is_err());
        assert_eq!(m.len(), 1);
        assert_eq!(m.push(Row::new()).unwrap(), "1");
    }

    #[test]
    fn test_duplicate_tag_rejected_without_mutation() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("rat", kinded("monster")).unwrap();

        let rejected = m.insert("rat", kinded("monster"));
        let row = rejected.unwrap_err();
        assert_eq!(row.ident(), None); // identity untouched on failure
        assert_eq!(m.len(), 1);
        assert_eq!(m.get_where("kind", "monster").len(), 1);
        assert_eq!(m.position("rat"), Some(0));
    }

    #[test]
    fn test_positional_insert_and_front() {
        let mut m: TagMap<Row> = TagMap::new();
        m.insert("b", Row::new()).unwrap();
        m.insert_front("a", Row::new()).unwrap();
        m.insert_at(2, "c", Row::new()).unwrap();
        m.insert_at(99, "z", Row::new()).unwrap(); // clamped to the end

        let tags: Vec<_> = m.tags().map(Tag::as_str).collect();
        assert_eq!(tags, vec!["a", "b", "c", "z"]);
        assert_eq!(m.position("a"), Some(0));
        assert!(m.get_index(4).is_none());
    }

    #[test]
    fn test_identity_assignment_is_permanent() {
        let mut m: TagMap<Row> = TagMap::new();
        m.insert("a", Row::new()).unwrap();
        m.insert("b", Row::new()).unwrap();
        assert_eq!(m.get("a").unwrap().ident(), Some(0));
        assert_eq!(m.get("b").unwrap().ident(), Some(1));

        let a = m.remove("a").unwrap();
        assert_eq!(a.ident(), Some(0));
        m.insert("a2", a).unwrap();
        // reinsertion keeps the original identity; the counter does not move
        assert_eq!(m.get("a2").unwrap().ident(), Some(0));
        m.insert("c", Row::new()).unwrap();
        assert_eq!(m.get("c").unwrap().ident(), Some(2));
    }

    #[test]
    fn test_get_where_buckets_in_insertion_order() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("e1", kinded("a")).unwrap();
        m.insert("e2", kinded("a")).unwrap();
        m.insert("e3", kinded("b")).unwrap();

        let a: Vec<_> = m.get_where("kind", "a").map(|r| r.ident().unwrap()).collect();
        assert_eq!(a, vec![0, 1]);
        assert_eq!(m.get_where("kind", "b").len(), 1);
        assert_eq!(m.get_where("kind", "c").len(), 0);
        assert_eq!(m.get_where("unknown", "a").len(), 0);

        m.remove("e1").unwrap();
        let a: Vec<_> = m.get_where("kind", "a").map(|r| r.ident().unwrap()).collect();
        assert_eq!(a, vec![1]);
        m.remove("e2").unwrap();
        assert_eq!(m.get_where("kind", "a").len(), 0);
    }

    #[test]
    fn test_get_where_tag_special_case() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("rat", kinded("monster")).unwrap();

        let hits: Vec<_> = m.get_where("tag", "rat").collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].get("kind"), Some("monster"));
        assert_eq!(m.get_where("tag", "bat").len(), 0);
        assert!(m.get_first_where("tag", "rat").is_some());
    }

    #[test]
    fn test_field_absent_means_no_bucket() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("blank", Row::new()).unwrap(); // no "kind" field at all
        m.insert("rat", kinded("monster")).unwrap();

        assert_eq!(m.get_where("kind", "monster").len(), 1);
        // the blank element is findable by tag, just not through the index
        assert!(m.get("blank").is_some());
        m.remove("blank").unwrap(); // must not disturb any bucket
        assert_eq!(m.get_where("kind", "monster").len(), 1);
    }

    #[test]
    fn test_set_non_key_field_is_in_place() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("rat", kinded("monster")).unwrap();
        m.insert("bat", kinded("monster")).unwrap();

        assert!(m.set("rat", "hp", "4"));
        assert_eq!(m.get("rat").unwrap().get("hp"), Some("4"));
        assert_eq!(m.position("rat"), Some(0));
        assert_eq!(m.get_where("kind", "monster").len(), 2);
        assert!(!m.set("ghost", "hp", "4"));
    }

    #[test]
    fn test_set_key_field_reindexes_and_keeps_position() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("e1", kinded("a")).unwrap();
        m.insert("e2", kinded("a")).unwrap();
        m.insert("e3", kinded("b")).unwrap();

        let ident_before = m.get("e2").unwrap().ident();
        assert!(m.set("e2", "kind", "b"));

        assert_eq!(m.position("e2"), Some(1)); // order position preserved
        assert_eq!(m.get("e2").unwrap().ident(), ident_before);
        assert_eq!(m.get_where("kind", "a").len(), 1);
        let b: Vec<_> = m.get_where("kind", "b").map(|r| r.get("kind").unwrap()).collect();
        assert_eq!(b.len(), 2);
        assert!(!m.set("ghost", "kind", "b"));
    }

    #[test]
    fn test_remove_unknown_tag_is_a_no_op() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("rat", kinded("monster")).unwrap();
        assert!(m.remove("bat").is_none());
        assert_eq!(m.len(), 1);
        assert_eq!(m.get_where("kind", "monster").len(), 1);
    }

    #[test]
    fn test_iter_is_exact_size_and_fused() {
        let mut m: TagMap<Row> = TagMap::new();
        m.insert("a", Row::new()).unwrap();
        m.insert("b", Row::new()).unwrap();

        let mut it = m.iter();
        assert_eq!(it.len(), 2);
        assert_eq!(it.next().unwrap().0, "a");
        assert_eq!(it.len(), 1);
        assert_eq!(it.next().unwrap().0, "b");
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn test_matches_is_exact_size() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("e1", kinded("a")).unwrap();
        m.insert("e2", kinded("a")).unwrap();

        let mut it = m.get_where("kind", "a");
        assert_eq!(it.len(), 2);
        it.next().unwrap();
        assert_eq!(it.len(), 1);
        it.next().unwrap();
        assert_eq!(it.len(), 0);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_transform_preserves_tags_and_order() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("rat", kinded("monster")).unwrap();
        m.insert("door", kinded("fixture")).unwrap();

        let flipped = m.transform(["kind"], |_, row, _| {
            let kind = if row.get("kind") == Some("monster") { "fixture" } else { "monster" };
            Row::new().with("kind", kind)
        });
        let tags: Vec<_> = flipped.tags().map(Tag::as_str).collect();
        assert_eq!(tags, vec!["rat", "door"]);
        assert_eq!(flipped.get("rat").unwrap().get("kind"), Some("fixture"));
        assert_eq!(flipped.get_where("kind", "monster").len(), 1);
    }

    #[test]
    fn test_clear_keeps_counters_and_keys() {
        let mut m = TagMap::with_keys(["kind"]);
        m.push(kinded("a")).unwrap();
        m.push(kinded("a")).unwrap();
        m.clear();

        assert!(m.is_empty());
        assert!(m.is_key("kind"));
        assert_eq!(m.get_where("kind", "a").len(), 0);
        // generators keep going after a clear
        assert_eq!(m.push(kinded("a")).unwrap(), "2");
        assert_eq!(m.get("2").unwrap().ident(), Some(2));
    }

    #[test]
    fn test_from_iterator_and_extend() {
        let rows = vec![kinded("a"), kinded("b"), kinded("c")];
        let m: TagMap<Row> = rows.clone().into_iter().collect();
        assert_eq!(m.len(), 3);
        assert_eq!(m.tags().map(Tag::as_str).collect::<Vec<_>>(), vec!["0", "1", "2"]);

        let mut n: TagMap<Row> = TagMap::new();
        n.extend(rows);
        assert_eq!(n.len(), 3);
    }

    #[test]
    fn test_clone_and_eq() {
        let mut a = TagMap::with_keys(["kind"]);
        a.insert("rat", kinded("monster")).unwrap();
        let b = a.clone();
        assert_eq!(a, b);

        let mut c = b.clone();
        c.set("rat", "kind", "fixture");
        assert_ne!(a, c);

        // same contents, different key set: observably different maps
        let mut d: TagMap<Row> = TagMap::new();
        d.insert("rat", a.get("rat").unwrap().clone()).unwrap();
        assert_ne!(a, d);
    }

    #[test]
    fn test_debug_contains_tags() {
        let mut m = TagMap::with_keys(["kind"]);
        m.insert("rat", kinded("monster")).unwrap();
        let s = format!("{m:?}");
        assert!(s.contains("rat"));
    }
}
