//! Typed, tab-grouped display fields.
//!
//! A [`FieldTable`] is built once by a handler and then only read. Every
//! `add_*` helper appends exactly one [`Field`] to the current tab and
//! returns its index. Helpers never panic on bad input: the field is
//! appended without a payload and [`Field::is_valid`] reports `false`.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::ops::BitOr;
use std::rc::Rc;

use crate::image::Bitmap;

/// Display hints for string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringFlags(u32);

impl StringFlags {
    pub const NONE: StringFlags = StringFlags(0);
    pub const MONOSPACE: StringFlags = StringFlags(1 << 0);
    pub const WARNING: StringFlags = StringFlags(1 << 1);
    /// Trim trailing whitespace before storing.
    pub const TRIM_END: StringFlags = StringFlags(1 << 2);

    pub const fn contains(self, other: StringFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for StringFlags {
    type Output = StringFlags;

    fn bitor(self, rhs: Self) -> Self {
        StringFlags(self.0 | rhs.0)
    }
}

/// Which parts of a timestamp are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateTimeFlags(u32);

impl DateTimeFlags {
    pub const HAS_DATE: DateTimeFlags = DateTimeFlags(1 << 0);
    pub const HAS_TIME: DateTimeFlags = DateTimeFlags(1 << 1);
    /// Timestamp is UTC rather than local wall time.
    pub const IS_UTC: DateTimeFlags = DateTimeFlags(1 << 2);

    pub const fn contains(self, other: DateTimeFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DateTimeFlags {
    type Output = DateTimeFlags;

    fn bitor(self, rhs: Self) -> Self {
        DateTimeFlags(self.0 | rhs.0)
    }
}

/// Layout options for [`ListData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListFlags(u32);

impl ListFlags {
    pub const NONE: ListFlags = ListFlags(0);
    /// Show the list on its own row below the label.
    pub const SEPARATE_ROW: ListFlags = ListFlags(1 << 0);
    pub const CHECKBOXES: ListFlags = ListFlags(1 << 1);
    pub const ICONS: ListFlags = ListFlags(1 << 2);

    pub const fn contains(self, other: ListFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ListFlags {
    type Output = ListFlags;

    fn bitor(self, rhs: Self) -> Self {
        ListFlags(self.0 | rhs.0)
    }
}

/// Radix for [`FieldTable::add_string_numeric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    Dec,
    Hex,
}

/// Rows of a [`ListData`] field.
#[derive(Debug, Clone, PartialEq)]
pub enum ListRows {
    Single(Vec<Vec<String>>),
    /// One row set per language code, all with the same row count.
    PerLanguage(BTreeMap<u32, Vec<Vec<String>>>),
}

impl ListRows {
    /// Row count (of any language, they are equal once validated).
    pub fn row_count(&self) -> usize {
        match self {
            ListRows::Single(rows) => rows.len(),
            ListRows::PerLanguage(map) => map.values().next().map_or(0, Vec::len),
        }
    }
}

/// Tabular field.
#[derive(Debug, Clone, PartialEq)]
pub struct ListData {
    pub headers: Option<Vec<String>>,
    pub flags: ListFlags,
    pub rows: ListRows,
    /// Language to show first for [`ListRows::PerLanguage`].
    pub default_language: u32,
    /// One bit per row when [`ListFlags::CHECKBOXES`] is set.
    pub checkboxes: u32,
    /// One entry per row when [`ListFlags::ICONS`] is set.
    pub icons: Vec<Option<Rc<Bitmap>>>,
}

impl ListData {
    /// Plain list with column headers.
    pub fn new(headers: Option<Vec<String>>, rows: ListRows) -> Self {
        Self {
            headers,
            flags: ListFlags::NONE,
            rows,
            default_language: 0,
            checkboxes: 0,
            icons: Vec::new(),
        }
    }

    fn is_consistent(&self) -> bool {
        if self.flags.contains(ListFlags::CHECKBOXES | ListFlags::ICONS) {
            return false;
        }
        let sets: Vec<&Vec<Vec<String>>> = match &self.rows {
            ListRows::Single(rows) => vec![rows],
            ListRows::PerLanguage(map) => {
                if map.is_empty() {
                    return false;
                }
                map.values().collect()
            }
        };
        let count = sets[0].len();
        if count == 0 && self.headers.is_none() {
            return false;
        }
        let width = self
            .headers
            .as_ref()
            .map(Vec::len)
            .or_else(|| sets[0].first().map(Vec::len));
        for set in &sets {
            if set.len() != count {
                return false;
            }
            if let Some(w) = width
                && set.iter().any(|row| row.len() != w)
            {
                return false;
            }
        }
        if self.flags.contains(ListFlags::ICONS) && self.icons.len() != count {
            return false;
        }
        true
    }
}

/// Rating authorities, indexing [`AgeRatings`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RatingAuthority {
    /// CERO
    Japan = 0,
    /// ESRB
    Usa = 1,
    /// USK
    Germany = 3,
    /// PEGI
    Europe = 4,
    /// MEKU
    Finland = 5,
    /// PEGI-PT
    Portugal = 6,
    /// BBFC
    England = 7,
    /// ACB
    Australia = 8,
    /// GRB
    SouthKorea = 9,
    /// CGSRR
    Taiwan = 10,
}

const RATING_ABBREVS: [&str; AgeRatings::COUNT] = [
    "CERO", "ESRB", "", "USK", "PEGI", "MEKU", "PEGI-PT", "BBFC", "ACB", "GRB", "CGSRR", "", "", "",
    "", "",
];

/// Sixteen per-authority age rating slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AgeRatings(pub [u16; AgeRatings::COUNT]);

impl AgeRatings {
    pub const COUNT: usize = 16;

    pub const MIN_AGE_MASK: u16 = 0x001F;
    pub const ACTIVE: u16 = 0x0020;
    pub const PENDING: u16 = 0x0040;
    pub const NO_RESTRICTION: u16 = 0x0080;
    pub const ONLINE_PLAY: u16 = 0x0100;
    pub const PROHIBITED: u16 = 0x0200;

    pub fn set(&mut self, who: RatingAuthority, rating: u16) {
        self.0[who as usize] = rating;
    }

    pub fn get(&self, who: RatingAuthority) -> u16 {
        self.0[who as usize]
    }

    /// Convert one Nintendo-style rating byte: `0x80` active, `0x40`
    /// pending, `0x20` no restriction, low five bits minimum age.
    pub fn from_nintendo_byte(b: u8) -> u16 {
        if b & 0x80 == 0 {
            return 0;
        }
        let mut r = Self::ACTIVE;
        if b & 0x40 != 0 {
            r |= Self::PENDING;
        } else if b & 0x20 != 0 {
            r |= Self::NO_RESTRICTION;
        } else {
            r |= (b & 0x1F) as u16;
        }
        r
    }

    /// Convert a Nintendo rating array, keeping only slots set in `valid_mask`.
    pub fn from_nintendo(raw: &[u8; 16], valid_mask: u16) -> Self {
        let mut out = AgeRatings::default();
        for (i, &b) in raw.iter().enumerate() {
            if valid_mask & (1 << i) != 0 {
                out.0[i] = Self::from_nintendo_byte(b);
            }
        }
        out
    }

    /// Abbreviation of the authority in slot `idx`, if it has one.
    pub fn abbrev(idx: usize) -> Option<&'static str> {
        RATING_ABBREVS.get(idx).copied().filter(|s| !s.is_empty())
    }

    /// Human-readable rating for slot `idx`, without the authority name.
    ///
    /// Empty if the rating is not active.
    pub fn decode(idx: usize, rating: u16) -> String {
        if rating & Self::ACTIVE == 0 {
            return String::new();
        }
        let age = rating & Self::MIN_AGE_MASK;
        let label = if rating & Self::PROHIBITED != 0 {
            Some("No")
        } else if rating & Self::PENDING != 0 {
            Some("RP")
        } else if rating & Self::NO_RESTRICTION != 0 {
            Some("All")
        } else {
            match (idx, age) {
                (0, 0) => Some("A"),
                (0, 12) => Some("B"),
                (0, 15) => Some("C"),
                (0, 17) => Some("D"),
                (0, 18) => Some("Z"),
                (1, 3) => Some("eC"),
                (1, 6) => Some("E"),
                (1, 10) => Some("E10+"),
                (1, 13) => Some("T"),
                (1, 17) => Some("M"),
                (1, 18) => Some("AO"),
                (8, 0) => Some("G"),
                (8, 7) => Some("PG"),
                (8, 14) => Some("M"),
                (8, 15) => Some("MA15+"),
                (8, 18) => Some("R18+"),
                _ => None,
            }
        };
        let mut s = label.map_or_else(|| age.to_string(), str::to_owned);
        if rating & Self::ONLINE_PLAY != 0 {
            s.push('°');
        }
        s
    }

    /// All active ratings as `"ESRB=E, PEGI=3"`; `"None"` if there are none.
    ///
    /// With `newlines`, every fourth separator becomes `",\n"`.
    pub fn summary(&self, newlines: bool) -> String {
        let mut out = String::new();
        let mut count = 0;
        for (i, &rating) in self.0.iter().enumerate() {
            if rating & Self::ACTIVE == 0 {
                continue;
            }
            if count > 0 {
                out.push_str(if newlines && count % 4 == 0 { ",\n" } else { ", " });
            }
            match Self::abbrev(i) {
                Some(a) => out.push_str(a),
                None => {
                    let _ = write!(out, "{i}");
                }
            }
            out.push('=');
            out.push_str(&Self::decode(i, rating));
            count += 1;
        }
        if count == 0 {
            out.push_str("None");
        }
        out
    }
}

/// A string with per-language variants.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiString {
    pub values: BTreeMap<u32, String>,
    pub default_language: u32,
}

impl MultiString {
    /// Value for `lc`, else the default language, else any value.
    pub fn get(&self, lc: u32) -> Option<&str> {
        self.values
            .get(&lc)
            .or_else(|| self.values.get(&self.default_language))
            .or_else(|| self.values.values().next())
            .map(String::as_str)
    }
}

/// Field payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String {
        value: String,
        flags: StringFlags,
    },
    Bitfield {
        names: Vec<String>,
        /// Names per display row; 0 picks a default.
        per_row: usize,
        value: u32,
    },
    ListData(ListData),
    DateTime {
        /// Seconds since the Unix epoch.
        timestamp: i64,
        flags: DateTimeFlags,
    },
    AgeRatings(AgeRatings),
    Dimensions {
        width: u32,
        height: Option<u32>,
        depth: Option<u32>,
    },
    MultiString(MultiString),
}

/// One labeled field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub tab: u8,
    /// `None` if the field was added with bad input.
    pub value: Option<FieldValue>,
}

impl Field {
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }
}

/// Ordered list of fields plus tab names.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldTable {
    fields: Vec<Field>,
    tabs: Vec<String>,
    tab: u8,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// First field named `name`.
    pub fn find(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// String payload of the first valid string field named `name`.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|f| match &f.value {
            Some(FieldValue::String { value, .. }) if f.name == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// Number of tabs (always at least one).
    pub fn tab_count(&self) -> usize {
        self.tabs.len().max(self.tab as usize + 1)
    }

    /// Name of tab `idx`, if one was set.
    pub fn tab_name(&self, idx: usize) -> Option<&str> {
        self.tabs.get(idx).map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Name tab `idx`. Only existing tabs or the next new one can be named.
    pub fn set_tab_name(&mut self, idx: usize, name: impl Into<String>) -> bool {
        if idx > self.tab_count() || idx > u8::MAX as usize {
            return false;
        }
        if self.tabs.len() <= idx {
            self.tabs.resize(idx + 1, String::new());
        }
        self.tabs[idx] = name.into();
        true
    }

    /// Switch to tab `idx`. Tabs are consecutive, so `idx` may be at most
    /// one past the last tab.
    pub fn set_tab_index(&mut self, idx: usize) -> bool {
        if idx > self.tab_count() || idx > u8::MAX as usize {
            return false;
        }
        if self.tabs.len() <= idx {
            self.tabs.resize(idx + 1, String::new());
        }
        self.tab = idx as u8;
        true
    }

    /// Append a new tab, make it current, and return its index.
    ///
    /// If nothing has been added yet the first tab is reused.
    pub fn add_tab(&mut self, name: impl Into<String>) -> usize {
        let idx = if self.fields.is_empty() && self.tab == 0 && self.tab_name(0).is_none() {
            0
        } else {
            self.tab_count()
        };
        self.set_tab_name(idx, name);
        self.set_tab_index(idx);
        idx
    }

    fn push(&mut self, name: impl Into<String>, value: Option<FieldValue>) -> usize {
        self.fields.push(Field {
            name: name.into(),
            tab: self.tab,
            value,
        });
        self.fields.len() - 1
    }

    pub fn add_string(&mut self, name: impl Into<String>, value: impl Into<String>) -> usize {
        self.add_string_flags(name, value, StringFlags::NONE)
    }

    pub fn add_string_flags(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        flags: StringFlags,
    ) -> usize {
        let mut value = value.into();
        if flags.contains(StringFlags::TRIM_END) {
            value.truncate(value.trim_end().len());
        }
        self.push(name, Some(FieldValue::String { value, flags }))
    }

    /// Format `value` in `base`, zero-padded to `digits`.
    pub fn add_string_numeric(
        &mut self,
        name: impl Into<String>,
        value: u32,
        base: Base,
        digits: usize,
        flags: StringFlags,
    ) -> usize {
        let s = match base {
            Base::Dec => format!("{value:0digits$}"),
            Base::Hex => format!("0x{value:0digits$X}"),
        };
        self.add_string_flags(name, s, flags)
    }

    /// Space-separated uppercase hex bytes.
    pub fn add_string_hexdump(&mut self, name: impl Into<String>, bytes: &[u8]) -> usize {
        let s = bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        self.add_string_flags(name, s, StringFlags::MONOSPACE)
    }

    /// Requires a non-empty list of bit names.
    pub fn add_bitfield<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        names: impl IntoIterator<Item = S>,
        per_row: usize,
        value: u32,
    ) -> usize {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let v = (!names.is_empty() && names.len() <= 32).then_some(FieldValue::Bitfield {
            names,
            per_row,
            value,
        });
        self.push(name, v)
    }

    pub fn add_list_data(&mut self, name: impl Into<String>, data: ListData) -> usize {
        let v = data.is_consistent().then_some(FieldValue::ListData(data));
        self.push(name, v)
    }

    /// Requires at least one of date or time.
    /// A `None` timestamp is stored as an invalid field.
    pub fn add_datetime(
        &mut self,
        name: impl Into<String>,
        timestamp: impl Into<Option<i64>>,
        flags: DateTimeFlags,
    ) -> usize {
        let usable =
            flags.contains(DateTimeFlags::HAS_DATE) || flags.contains(DateTimeFlags::HAS_TIME);
        let v = timestamp
            .into()
            .filter(|_| usable)
            .map(|timestamp| FieldValue::DateTime { timestamp, flags });
        self.push(name, v)
    }

    pub fn add_age_ratings(&mut self, name: impl Into<String>, ratings: AgeRatings) -> usize {
        self.push(name, Some(FieldValue::AgeRatings(ratings)))
    }

    /// Zero `height`/`depth` mean "absent"; zero `width` is invalid.
    pub fn add_dimensions(
        &mut self,
        name: impl Into<String>,
        width: u32,
        height: u32,
        depth: u32,
    ) -> usize {
        let v = (width != 0).then(|| FieldValue::Dimensions {
            width,
            height: (height != 0).then_some(height),
            depth: (depth != 0 && height != 0).then_some(depth),
        });
        self.push(name, v)
    }

    /// Per-language string. Entries identical to the default language's
    /// entry are dropped so the same text is not shown twice.
    pub fn add_multi_string(
        &mut self,
        name: impl Into<String>,
        mut values: BTreeMap<u32, String>,
        default_language: u32,
    ) -> usize {
        if let Some(def) = values.get(&default_language).cloned() {
            values.retain(|&lc, v| lc == default_language || *v != def);
        }
        let v = (!values.is_empty()).then_some(FieldValue::MultiString(MultiString {
            values,
            default_language,
        }));
        self.push(name, v)
    }
}
