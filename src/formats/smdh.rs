//! Nintendo 3DS SMDH - title metadata and icons (`.smdh`, also embedded in
//! `.3dsx` and CIA files).
//!
//! ## Layout (0x36C0 bytes, little-endian)
//! ```text
//! [0x0000] Magic "SMDH"
//! [0x0004] Version (u16)
//! [0x0008] Titles        16 × 0x200: short (0x80), long (0x100), publisher (0x80), UTF-16LE
//! [0x2008] Age ratings   16 bytes, one per authority
//! [0x2018] Region code   (u32 bitfield)
//! [0x201C] Match maker IDs
//! [0x2028] Flags         (u32 bitfield)
//! [0x2040] Small icon    24x24 RGB565, 8x8 tiles
//! [0x24C0] Large icon    48x48 RGB565, 8x8 tiles
//! ```

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::{
    LC_DE, LC_EN, LC_ES, LC_FR, LC_HANS, LC_HANT, LC_IT, LC_JA, LC_KO, LC_NL, LC_PT, LC_RU,
    Settings,
};
use crate::detector::DetectInfo;
use crate::fields::{AgeRatings, FieldTable};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::image::{
    Bitmap, ImageProcessing, ImageSizeDef, ImageType, ImageTypes, decode_rgb565_3ds,
};
use crate::metadata::{MetadataSet, Property};
use crate::text::utf16le;
use crate::{Error, Result};

pub const SMDH_SIZE: usize = 0x36C0;
const TITLES_ADDR: usize = 0x8;
const TITLE_SIZE: usize = 0x200;
/// Title slots; the last four have no language assigned.
pub const TITLE_COUNT: usize = 16;
const RATINGS_ADDR: usize = 0x2008;
const REGION_ADDR: usize = 0x2018;
const FLAGS_ADDR: usize = 0x2028;
const ICON_SMALL_ADDR: usize = 0x2040;
const ICON_LARGE_ADDR: usize = 0x24C0;

/// Rating slots a 3DS title may fill: 0-1, 3-4, 6-10.
const VALID_RATINGS: u16 = 0x07DB;

/// Title slot order.
const LANGUAGES: [u32; 12] = [
    LC_JA, LC_EN, LC_FR, LC_DE, LC_IT, LC_ES, LC_HANS, LC_KO, LC_NL, LC_PT, LC_RU, LC_HANT,
];
const LANG_JAPANESE: usize = 0;
const LANG_ENGLISH: usize = 1;

const REGION_NAMES: [&str; 7] = [
    "Japan",
    "USA",
    "Europe",
    "Australia",
    "China",
    "South Korea",
    "Taiwan",
];

const FLAG_NAMES: [&str; 13] = [
    "Visible",
    "Auto-Boot",
    "Allow 3D",
    "Require EULA",
    "Auto-Save on Exit",
    "Extended Banner",
    "Rating Required",
    "Uses Save Data",
    "Record Usage",
    "",
    "No Save Backups",
    "",
    "New3DS Only",
];

/// One title slot, already decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Title {
    pub short: String,
    pub long: String,
    pub publisher: String,
}

impl Title {
    fn parse(raw: &[u8]) -> Self {
        Self {
            short: utf16le(&raw[..0x80]),
            long: utf16le(&raw[0x80..0x180]),
            publisher: utf16le(&raw[0x180..0x200]),
        }
    }
}

#[derive(Debug)]
pub struct Smdh {
    pub version: u16,
    pub titles: Vec<Title>,
    pub ratings: [u8; 16],
    pub region: u32,
    pub flags: u32,
    icon_data: Vec<u8>,
    /// Slot used for single-language output.
    lang: usize,
}

impl Smdh {
    pub fn parse(buf: &[u8], settings: &Settings) -> Result<Self> {
        if buf.len() < SMDH_SIZE {
            return Err(Error::Truncated);
        }
        if &buf[..4] != b"SMDH" {
            return Err(Error::BadMagic);
        }
        let titles: Vec<Title> = (0..TITLE_COUNT)
            .map(|i| {
                let off = TITLES_ADDR + i * TITLE_SIZE;
                Title::parse(&buf[off..off + TITLE_SIZE])
            })
            .collect();
        let mut ratings = [0u8; 16];
        ratings.copy_from_slice(&buf[RATINGS_ADDR..RATINGS_ADDR + 16]);
        let u32_at = |off: usize| u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]);

        let lang = Self::pick_language(&titles, settings.language);
        Ok(Self {
            version: u16::from_le_bytes([buf[4], buf[5]]),
            ratings,
            region: u32_at(REGION_ADDR),
            flags: u32_at(FLAGS_ADDR),
            icon_data: buf[ICON_SMALL_ADDR..SMDH_SIZE].to_vec(),
            titles,
            lang,
        })
    }

    /// Requested language, else English, else Japanese, else English.
    fn pick_language(titles: &[Title], lc: u32) -> usize {
        let has = |i: usize| titles.get(i).is_some_and(|t| !t.short.is_empty());
        match LANGUAGES.iter().position(|&l| l == lc) {
            Some(i) if has(i) => i,
            _ if has(LANG_ENGLISH) => LANG_ENGLISH,
            _ if has(LANG_JAPANESE) => LANG_JAPANESE,
            _ => LANG_ENGLISH,
        }
    }

    /// The title slot used for single-language output.
    pub fn title(&self) -> &Title {
        &self.titles[self.lang]
    }

    pub fn age_ratings(&self) -> AgeRatings {
        AgeRatings::from_nintendo(&self.ratings, VALID_RATINGS)
    }

    /// Decode icon `idx`: 0 is 24x24, 1 is 48x48.
    pub fn icon(&self, idx: u16) -> Result<Bitmap> {
        match idx {
            0 => decode_rgb565_3ds(24, 24, &self.icon_data),
            1 => decode_rgb565_3ds(48, 48, &self.icon_data[ICON_LARGE_ADDR - ICON_SMALL_ADDR..]),
            _ => Err(Error::NotApplicable),
        }
    }

    fn per_language(&self, pick: impl Fn(&Title) -> &str) -> BTreeMap<u32, String> {
        LANGUAGES
            .iter()
            .zip(&self.titles)
            .filter_map(|(&lc, t)| {
                let s = pick(t);
                (!s.is_empty()).then(|| (lc, s.to_owned()))
            })
            .collect()
    }
}

impl FormatParser for Smdh {
    const CLASS_NAME: &'static str = "Nintendo3DS_SMDH";
    const FILE_TYPE: FileType = FileType::IconFile;
    const EXTENSIONS: &'static [&'static str] = &[".smdh"];
    const MIME_TYPES: &'static [&'static str] = &["application/x-nintendo-3ds-smdh"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        (info.header_addr == 0 && info.header.starts_with(b"SMDH")).then_some(0)
    }

    fn open(file: &SharedFile, settings: &Settings) -> Result<Self> {
        let buf = file.read_exact_at(0, SMDH_SIZE)?;
        Self::parse(&buf, settings)
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        pick_name(&["Nintendo 3DS", "Nintendo 3DS", "3DS"], kind)
    }

    fn image_types() -> ImageTypes {
        ImageTypes::of(ImageType::IntIcon)
    }

    fn image_sizes(_t: ImageType) -> Vec<ImageSizeDef> {
        vec![
            ImageSizeDef {
                index: 0,
                ..ImageSizeDef::new(24, 24)
            },
            ImageSizeDef {
                index: 1,
                ..ImageSizeDef::new(48, 48)
            },
        ]
    }

    fn image_processing(_t: ImageType) -> ImageProcessing {
        ImageProcessing::NEAREST_NEIGHBOR
    }

    fn load_fields(
        &mut self,
        _file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        fields.set_tab_name(0, "SMDH");
        let def = LANGUAGES[self.lang];
        let short = self.per_language(|t| t.short.as_str());
        if !short.is_empty() {
            fields.add_multi_string(settings.tr("Nintendo3DS", "Title"), short, def);
        }
        let long = self.per_language(|t| t.long.as_str());
        if !long.is_empty() {
            fields.add_multi_string(settings.tr("Nintendo3DS", "Full Title"), long, def);
        }
        let publisher = self.per_language(|t| t.publisher.as_str());
        if !publisher.is_empty() {
            fields.add_multi_string(settings.tr("RomData", "Publisher"), publisher, def);
        }

        let regions = REGION_NAMES.map(|n| settings.tr("Region", n));
        fields.add_bitfield(settings.tr("RomData", "Region Code"), regions, 3, self.region);
        let flags = FLAG_NAMES.map(|n| settings.tr("Nintendo3DS|Flags", n));
        fields.add_bitfield(settings.tr("Nintendo3DS", "Flags"), flags, 3, self.flags);
        fields.add_age_ratings(settings.tr("RomData", "Age Ratings"), self.age_ratings());
        Ok(())
    }

    fn load_metadata(
        &mut self,
        _file: &SharedFile,
        _settings: &Settings,
        meta: &mut MetadataSet,
    ) -> Result<()> {
        let t = self.title();
        let title = if t.long.is_empty() { &t.short } else { &t.long };
        if !title.is_empty() {
            meta.add_string(Property::Title, title);
        }
        if !t.publisher.is_empty() {
            meta.add_string(Property::Publisher, &t.publisher);
        }
        Ok(())
    }

    fn load_image(&mut self, _file: &SharedFile, _t: ImageType) -> Result<Option<Rc<Bitmap>>> {
        self.icon(1).map(|b| Some(Rc::new(b)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::fields::{FieldValue, RatingAuthority};
    use crate::file::MemFile;
    use crate::handler::{FormatHandler, RomData};
    use pretty_assertions::assert_eq;

    fn put_utf16(buf: &mut [u8], off: usize, s: &str) {
        for (i, u) in s.encode_utf16().enumerate() {
            buf[off + i * 2..off + i * 2 + 2].copy_from_slice(&u.to_le_bytes());
        }
    }

    /// SMDH with `(slot, short, long, publisher)` titles.
    pub(crate) fn smdh(titles: &[(usize, &str, &str, &str)]) -> Vec<u8> {
        let mut b = vec![0u8; SMDH_SIZE];
        b[..4].copy_from_slice(b"SMDH");
        for &(slot, short, long, publisher) in titles {
            let off = TITLES_ADDR + slot * TITLE_SIZE;
            put_utf16(&mut b, off, short);
            put_utf16(&mut b, off + 0x80, long);
            put_utf16(&mut b, off + 0x180, publisher);
        }
        b[RATINGS_ADDR + 1] = 0x8D;
        b[RATINGS_ADDR + 2] = 0x80;
        b[REGION_ADDR] = 0x06;
        b[FLAGS_ADDR] = 0x01;
        // large icon: first pixel pure red
        b[ICON_LARGE_ADDR..ICON_LARGE_ADDR + 2].copy_from_slice(&0xF800u16.to_le_bytes());
        b
    }

    fn open(data: Vec<u8>, settings: &Settings) -> RomData<Smdh> {
        RomData::new(SharedFile::new(MemFile::with_name(data, "icon.smdh")), settings)
    }

    #[test]
    fn test_language_pick() {
        let t = |s: &str| Title {
            short: s.to_owned(),
            ..Title::default()
        };
        let mut titles = vec![Title::default(); 12];
        titles[LANG_JAPANESE] = t("ja");
        assert_eq!(Smdh::pick_language(&titles, LC_DE), LANG_JAPANESE);
        titles[LANG_ENGLISH] = t("en");
        assert_eq!(Smdh::pick_language(&titles, LC_DE), LANG_ENGLISH);
        titles[3] = t("de");
        assert_eq!(Smdh::pick_language(&titles, LC_DE), 3);
        assert_eq!(Smdh::pick_language(&[], LC_DE), LANG_ENGLISH);
    }

    #[test]
    fn test_fields_and_metadata() {
        let data = smdh(&[
            (LANG_ENGLISH, "Game", "The Game", "Pub"),
            (LANG_JAPANESE, "ゲーム", "", "Pub"),
        ]);
        let mut rd = open(data, &Settings::default().language(LC_FR));
        assert!(rd.is_valid());
        let f = rd.fields().unwrap();
        assert_eq!(f.tab_name(0), Some("SMDH"));
        let Some(FieldValue::MultiString(title)) = &f.find("Title").unwrap().value else {
            panic!("expected a multi-string title");
        };
        assert_eq!(title.default_language, LC_EN);
        assert_eq!(title.get(LC_JA), Some("ゲーム"));
        assert_eq!(title.get(LC_FR), Some("Game"));
        let Some(FieldValue::MultiString(publisher)) = &f.find("Publisher").unwrap().value else {
            panic!("expected a multi-string publisher");
        };
        // identical to English, dropped
        assert_eq!(publisher.values.len(), 1);
        let Some(FieldValue::AgeRatings(r)) = &f.find("Age Ratings").unwrap().value else {
            panic!("expected ratings");
        };
        assert_eq!(r.get(RatingAuthority::Usa), AgeRatings::ACTIVE | 13);
        // slot 2 is not a 3DS authority
        assert_eq!(r.0[2], 0);

        let m = rd.metadata().unwrap();
        assert_eq!(m.string(Property::Title), Some("The Game"));
        assert_eq!(m.string(Property::Publisher), Some("Pub"));
    }

    #[test]
    fn test_icons() {
        let mut rd = open(smdh(&[(LANG_ENGLISH, "A", "", "")]), &Settings::default());
        let sizes = rd.supported_image_sizes(ImageType::IntIcon);
        assert_eq!(sizes.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1]);
        let icon = rd.image(ImageType::IntIcon).unwrap().unwrap();
        assert_eq!((icon.width(), icon.height()), (48, 48));
        assert_eq!(icon.pixel(0, 0), Some(0xFFFF0000));
        let small = rd.parser().unwrap().icon(0).unwrap();
        assert_eq!(small.width(), 24);
    }

    #[test]
    fn test_all_title_slots_parsed() {
        let data = smdh(&[(LANG_ENGLISH, "Game", "", ""), (15, "Spare", "", "")]);
        let s = Smdh::parse(&data, &Settings::default()).unwrap();
        assert_eq!(s.titles.len(), TITLE_COUNT);
        assert_eq!(s.titles[15].short, "Spare");
        // unassigned slots stay out of the per-language fields
        let mut rd = open(data, &Settings::default());
        let Some(FieldValue::MultiString(title)) = &rd.fields().unwrap().find("Title").unwrap().value
        else {
            panic!("expected a multi-string title");
        };
        assert_eq!(title.values.len(), 1);
    }

    #[test]
    fn test_truncated() {
        let data = smdh(&[])[..0x2000].to_vec();
        assert!(!open(data, &Settings::default()).is_valid());
    }
}
