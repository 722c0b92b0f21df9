//! Static table of every format the detector knows about.
//!
//! Descriptors are grouped by how they are matched:
//!
//! | Table | Match rule |
//! |-------|------------|
//! | [`MAGIC`]  | big-endian `u32` at a fixed offset of the initial header window |
//! | [`HEADER`] | `is_supported` over a header window; non-zero offsets last |
//! | [`FOOTER`] | `is_supported` over the trailing window; extension must match |
//!
//! Dreamcast `.vms`/`.vmi` pairs are handled by the detector before any
//! table is consulted.

use std::collections::HashMap;
use std::ops::BitOr;
use std::sync::OnceLock;

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::file::SharedFile;
use crate::formats::{
    dc_save::DreamcastSave, dmg::Dmg, gamecom::GameCom, gbs::Gbs, gcn_bnr::GameCubeBnr,
    sid::Sid, smdh::Smdh, vgm::Vgm, wonderswan::WonderSwan, xdbf::Xdbf,
};
use crate::handler::FormatHandler;

/// Capabilities a caller can require of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Attrs(u32);

impl Attrs {
    pub const NONE: Attrs = Attrs(0);
    /// Format can produce a thumbnail image.
    pub const HAS_THUMBNAIL: Attrs = Attrs(1 << 0);
    /// Format fills a [`MetadataSet`](crate::MetadataSet).
    pub const HAS_METADATA: Attrs = Attrs(1 << 2);

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `required` is present.
    pub const fn satisfies(self, required: Attrs) -> bool {
        self.0 & required.0 == required.0
    }
}

impl BitOr for Attrs {
    type Output = Attrs;

    fn bitor(self, rhs: Self) -> Self {
        Attrs(self.0 | rhs.0)
    }
}

/// How a descriptor is matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// `magic` as a big-endian `u32` at `addr` of the initial window.
    Magic { addr: u32, magic: u32 },
    /// Header window at `addr`; `size == 0` means "the initial window".
    Header { addr: u32, size: u32 },
    /// Trailing window.
    Footer,
}

/// Detection predicate: class-specific type id on a match.
pub type SupportedFn = fn(&DetectInfo<'_>) -> Option<u32>;

/// Handler constructor: `None` unless the handler validates.
pub type OpenFn = fn(&SharedFile, &Settings) -> Option<Box<dyn FormatHandler>>;

/// One catalog entry.
pub struct FormatDescriptor {
    pub name: &'static str,
    pub rule: MatchRule,
    pub attrs: Attrs,
    pub extensions: &'static [&'static str],
    pub mime_types: &'static [&'static str],
    pub is_supported: SupportedFn,
    pub open: OpenFn,
}

impl std::fmt::Debug for FormatDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatDescriptor")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

impl FormatDescriptor {
    /// Case-insensitive extension match (`ext` includes the dot).
    pub fn handles_extension(&self, ext: &str) -> bool {
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

macro_rules! descriptor {
    ($ty:ty, $rule:expr, $attrs:expr) => {
        FormatDescriptor {
            name: <$ty as $crate::handler::FormatParser>::CLASS_NAME,
            rule: $rule,
            attrs: $attrs,
            extensions: <$ty as $crate::handler::FormatParser>::EXTENSIONS,
            mime_types: <$ty as $crate::handler::FormatParser>::MIME_TYPES,
            is_supported: <$ty as $crate::handler::FormatParser>::is_supported,
            open: $crate::handler::open_boxed::<$ty>,
        }
    };
}

const fn magic(addr: u32, m: &[u8; 4]) -> MatchRule {
    MatchRule::Magic {
        addr,
        magic: u32::from_be_bytes(*m),
    }
}

const HEADER_0: MatchRule = MatchRule::Header { addr: 0, size: 0 };
const THUMB_META: Attrs = Attrs(Attrs::HAS_THUMBNAIL.0 | Attrs::HAS_METADATA.0);

/// Formats with a 32-bit magic number.
pub static MAGIC: &[FormatDescriptor] = &[
    descriptor!(Dmg, MatchRule::Magic { addr: 0x104, magic: 0xCEED6666 }, Attrs::HAS_METADATA),
    descriptor!(Smdh, magic(0, b"SMDH"), THUMB_META),
    descriptor!(Xdbf, magic(0, b"XDBF"), THUMB_META),
    descriptor!(Gbs, magic(0, b"GBS\x01"), Attrs::HAS_METADATA),
    descriptor!(Vgm, magic(0, b"Vgm "), Attrs::HAS_METADATA),
];

/// Formats that need a structural check of a header window.
pub static HEADER: &[FormatDescriptor] = &[
    descriptor!(DreamcastSave, HEADER_0, Attrs::HAS_THUMBNAIL),
    descriptor!(GameCubeBnr, HEADER_0, THUMB_META),
    descriptor!(Sid, HEADER_0, Attrs::HAS_METADATA),
    descriptor!(GameCom, HEADER_0, Attrs::HAS_THUMBNAIL),
    descriptor!(
        GameCom,
        MatchRule::Header {
            addr: crate::formats::gamecom::HEADER_ADDRESS,
            size: crate::formats::gamecom::HEADER_SIZE,
        },
        Attrs::HAS_THUMBNAIL
    ),
];

/// Formats identified by a trailer.
pub static FOOTER: &[FormatDescriptor] = &[descriptor!(WonderSwan, MatchRule::Footer, Attrs::NONE)];

/// Every descriptor, in detection order.
pub fn all() -> impl Iterator<Item = &'static FormatDescriptor> {
    MAGIC.iter().chain(HEADER).chain(FOOTER)
}

/// A supported extension and the union of its formats' attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtInfo {
    pub ext: &'static str,
    pub attrs: Attrs,
}

/// All extensions, first-seen order, duplicates merged case-insensitively.
///
/// Computed once per process.
pub fn supported_extensions() -> &'static [ExtInfo] {
    static EXTS: OnceLock<Vec<ExtInfo>> = OnceLock::new();
    EXTS.get_or_init(|| {
        let mut out: Vec<ExtInfo> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for d in all() {
            for &ext in d.extensions {
                let key = ext.to_ascii_lowercase();
                match seen.get(&key) {
                    Some(&i) => out[i].attrs = out[i].attrs | d.attrs,
                    None => {
                        seen.insert(key, out.len());
                        out.push(ExtInfo {
                            ext,
                            attrs: d.attrs,
                        });
                    }
                }
            }
        }
        out
    })
}

/// All MIME types, first-seen order, without duplicates.
///
/// Computed once per process.
pub fn supported_mime_types() -> &'static [&'static str] {
    static MIMES: OnceLock<Vec<&'static str>> = OnceLock::new();
    MIMES.get_or_init(|| {
        let mut out: Vec<&'static str> = Vec::new();
        for d in all() {
            for &m in d.mime_types {
                if !out.contains(&m) {
                    out.push(m);
                }
            }
        }
        out
    })
}
