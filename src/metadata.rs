//! Cross-format metadata properties for indexers.
//!
//! Unlike [`FieldTable`](crate::FieldTable), a [`MetadataSet`] uses a fixed
//! vocabulary of [`Property`] ids with a fixed value kind each, so consumers
//! can map them onto their own schema without knowing the source format.

/// Value kind a property accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Integer,
    UnsignedInteger,
    String,
    /// Seconds since the Unix epoch.
    Timestamp,
}

/// Standard metadata properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    // Audio
    BitRate,
    Channels,
    /// Milliseconds.
    Duration,
    Genre,
    SampleRate,
    TrackNumber,
    ReleaseYear,
    Comment,
    Artist,
    Album,
    AlbumArtist,
    Composer,
    Lyricist,

    // Document
    Author,
    Title,
    Subject,
    Generator,
    Language,
    Copyright,
    Publisher,
    CreationDate,
    Description,

    // Image
    Width,
    Height,
}

impl Property {
    pub const fn kind(self) -> PropertyKind {
        use Property::*;
        match self {
            BitRate | Channels | Duration | SampleRate | Width | Height => PropertyKind::Integer,
            TrackNumber | ReleaseYear => PropertyKind::UnsignedInteger,
            CreationDate => PropertyKind::Timestamp,
            Genre | Comment | Artist | Album | AlbumArtist | Composer | Lyricist | Author
            | Title | Subject | Generator | Language | Copyright | Publisher | Description => {
                PropertyKind::String
            }
        }
    }
}

/// A property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    Integer(i64),
    UnsignedInteger(u64),
    String(String),
    Timestamp(i64),
}

/// Ordered set of `(Property, MetaValue)` pairs; one value per property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetadataSet {
    items: Vec<(Property, MetaValue)>,
}

impl MetadataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, p: Property) -> Option<&MetaValue> {
        self.items.iter().find(|(k, _)| *k == p).map(|(_, v)| v)
    }

    /// String value of `p`, if set.
    pub fn string(&self, p: Property) -> Option<&str> {
        match self.get(p)? {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Property, MetaValue)> {
        self.items.iter()
    }

    fn insert(&mut self, p: Property, v: MetaValue) -> usize {
        if let Some(idx) = self.items.iter().position(|(k, _)| *k == p) {
            self.items[idx].1 = v;
            idx
        } else {
            self.items.push((p, v));
            self.items.len() - 1
        }
    }

    /// Returns `None` if `p` is not an integer property.
    pub fn add_integer(&mut self, p: Property, v: i64) -> Option<usize> {
        (p.kind() == PropertyKind::Integer).then(|| self.insert(p, MetaValue::Integer(v)))
    }

    /// Returns `None` if `p` is not an unsigned integer property.
    pub fn add_unsigned(&mut self, p: Property, v: u64) -> Option<usize> {
        (p.kind() == PropertyKind::UnsignedInteger)
            .then(|| self.insert(p, MetaValue::UnsignedInteger(v)))
    }

    /// Trailing whitespace is trimmed. Returns `None` if `p` is not a
    /// string property or the trimmed value is empty.
    pub fn add_string(&mut self, p: Property, v: impl AsRef<str>) -> Option<usize> {
        let v = v.as_ref().trim_end();
        if p.kind() != PropertyKind::String || v.is_empty() {
            return None;
        }
        Some(self.insert(p, MetaValue::String(v.to_owned())))
    }

    /// Returns `None` if `p` is not a timestamp property.
    pub fn add_timestamp(&mut self, p: Property, t: i64) -> Option<usize> {
        (p.kind() == PropertyKind::Timestamp).then(|| self.insert(p, MetaValue::Timestamp(t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut m = MetadataSet::new();
        assert_eq!(m.add_integer(Property::Title, 1), None);
        assert_eq!(m.add_string(Property::Duration, "1:00"), None);
        assert_eq!(m.add_timestamp(Property::Title, 0), None);
        assert!(m.is_empty());
    }

    #[test]
    fn test_replace_and_trim() {
        let mut m = MetadataSet::new();
        assert_eq!(m.add_string(Property::Title, "First  "), Some(0));
        assert_eq!(m.add_integer(Property::Duration, 1500), Some(1));
        assert_eq!(m.add_string(Property::Title, "Second"), Some(0));
        assert_eq!(m.add_string(Property::Author, "   "), None);
        assert_eq!(m.string(Property::Title), Some("Second"));
        assert_eq!(m.get(Property::Duration), Some(&MetaValue::Integer(1500)));
        assert_eq!(m.len(), 2);
    }
}
