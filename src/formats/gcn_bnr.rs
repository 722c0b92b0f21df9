//! GameCube `opening.bnr` banners.
//!
//! ```text
//! [0x0000] Magic "BNR1" (US/JP, one comment) or "BNR2" (PAL, six comments)
//! [0x0004] Reserved (0x1C bytes)
//! [0x0020] Banner image, 96x32 RGB5A3 in 4x4 tiles (0x1800 bytes)
//! [0x1820] Comments, 0x140 bytes each:
//!          game name (0x20), company (0x20), full game name (0x40),
//!          full company (0x40), description (0x80)
//! ```
//!
//! BNR2 comments are in GameCube PAL language order: English, German,
//! French, Spanish, Italian, Dutch.

use std::rc::Rc;

use crate::config::{LC_DE, LC_ES, LC_FR, LC_IT, LC_NL, Settings};
use crate::detector::DetectInfo;
use crate::fields::FieldTable;
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::image::{Bitmap, ImageSizeDef, ImageType, ImageTypes, decode_rgb5a3_tiled};
use crate::metadata::{MetadataSet, Property};
use crate::text::cp1252;
use crate::{Error, Result};

const BANNER_ADDR: u64 = 0x20;
const BANNER_W: u32 = 96;
const BANNER_H: u32 = 32;
const BANNER_SIZE: usize = (BANNER_W * BANNER_H * 2) as usize;
const COMMENTS_ADDR: u64 = 0x1820;
const COMMENT_SIZE: usize = 0x140;

/// BNR1 = 0, BNR2 = 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BannerType {
    Bnr1 = 0,
    Bnr2 = 1,
}

impl BannerType {
    pub fn comment_count(self) -> usize {
        match self {
            BannerType::Bnr1 => 1,
            BannerType::Bnr2 => 6,
        }
    }

    pub fn file_size(self) -> u64 {
        COMMENTS_ADDR + (COMMENT_SIZE * self.comment_count()) as u64
    }
}

/// PAL language slot for a language code; English otherwise.
fn pal_language(lc: u32) -> usize {
    match lc {
        LC_DE => 1,
        LC_FR => 2,
        LC_ES => 3,
        LC_IT => 4,
        LC_NL => 5,
        _ => 0,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comment {
    pub game_name: String,
    pub company: String,
    pub game_name_full: String,
    pub company_full: String,
    pub description: String,
}

impl Comment {
    fn parse(raw: &[u8]) -> Self {
        Self {
            game_name: cp1252(&raw[0x00..0x20]),
            company: cp1252(&raw[0x20..0x40]),
            game_name_full: cp1252(&raw[0x40..0x80]),
            company_full: cp1252(&raw[0x80..0xC0]),
            description: cp1252(&raw[0xC0..0x140]),
        }
    }

    fn is_empty(&self) -> bool {
        self.game_name.is_empty()
            && self.company.is_empty()
            && self.game_name_full.is_empty()
            && self.company_full.is_empty()
            && self.description.is_empty()
    }

    pub fn title(&self) -> &str {
        if self.game_name_full.is_empty() {
            &self.game_name
        } else {
            &self.game_name_full
        }
    }

    pub fn publisher(&self) -> &str {
        if self.company_full.is_empty() {
            &self.company
        } else {
            &self.company_full
        }
    }
}

#[derive(Debug)]
pub struct GameCubeBnr {
    pub kind: BannerType,
    pub comments: Vec<Comment>,
    lang: usize,
}

impl GameCubeBnr {
    /// The comment for the configured language. A BNR2 slot with every
    /// field empty falls back to English.
    pub fn comment(&self) -> Option<&Comment> {
        match self.kind {
            BannerType::Bnr1 => self.comments.first(),
            BannerType::Bnr2 => self
                .comments
                .get(self.lang)
                .filter(|c| !c.is_empty())
                .or_else(|| self.comments.first()),
        }
    }
}

impl FormatParser for GameCubeBnr {
    const CLASS_NAME: &'static str = "GameCubeBNR";
    const FILE_TYPE: FileType = FileType::BannerFile;
    const EXTENSIONS: &'static [&'static str] = &[".bnr"];
    const MIME_TYPES: &'static [&'static str] = &["application/x-gamecube-bnr"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        if info.header_addr != 0 {
            return None;
        }
        let kind = match info.header.get(..4)? {
            b"BNR1" => BannerType::Bnr1,
            b"BNR2" => BannerType::Bnr2,
            _ => return None,
        };
        (info.file_size >= kind.file_size()).then_some(kind as u32)
    }

    fn open(file: &SharedFile, settings: &Settings) -> Result<Self> {
        let magic = file.read_exact_at(0, 4)?;
        let info = DetectInfo::new(&magic, 0, file.size(), None);
        let kind = match Self::is_supported(&info) {
            Some(0) => BannerType::Bnr1,
            Some(_) => BannerType::Bnr2,
            None => return Err(Error::BadMagic),
        };
        let raw = file.read_exact_at(COMMENTS_ADDR, COMMENT_SIZE * kind.comment_count())?;
        let comments = raw.chunks_exact(COMMENT_SIZE).map(Comment::parse).collect();
        Ok(Self {
            kind,
            comments,
            lang: pal_language(settings.language),
        })
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        pick_name(&["Nintendo GameCube", "GameCube", "GCN"], kind)
    }

    fn image_types() -> ImageTypes {
        ImageTypes::of(ImageType::IntBanner)
    }

    fn image_sizes(_t: ImageType) -> Vec<ImageSizeDef> {
        vec![ImageSizeDef::new(BANNER_W as u16, BANNER_H as u16)]
    }

    fn load_fields(
        &mut self,
        _file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        let Some(c) = self.comment() else {
            return Ok(());
        };
        for (key, value) in [
            ("Game Name", &c.game_name),
            ("Full Game Name", &c.game_name_full),
            ("Company", &c.company),
            ("Full Company", &c.company_full),
            ("Description", &c.description),
        ] {
            if !value.is_empty() {
                fields.add_string(settings.tr("GameCubeBNR", key), value.as_str());
            }
        }
        Ok(())
    }

    fn load_metadata(
        &mut self,
        _file: &SharedFile,
        _settings: &Settings,
        meta: &mut MetadataSet,
    ) -> Result<()> {
        if let Some(c) = self.comment() {
            meta.add_string(Property::Title, c.title());
            meta.add_string(Property::Publisher, c.publisher());
            meta.add_string(Property::Description, &c.description);
        }
        Ok(())
    }

    fn load_image(&mut self, file: &SharedFile, _t: ImageType) -> Result<Option<Rc<Bitmap>>> {
        let data = file.read_exact_at(BANNER_ADDR, BANNER_SIZE)?;
        let img = decode_rgb5a3_tiled(BANNER_W, BANNER_H, &data)?;
        Ok(Some(Rc::new(img)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::LC_EN;
    use crate::file::MemFile;
    use crate::handler::{FormatHandler, RomData};
    use pretty_assertions::assert_eq;

    /// Banner with `(game name, description)` per comment slot.
    pub(crate) fn bnr(magic: &[u8; 4], comments: &[(&str, &str)]) -> Vec<u8> {
        let kind = if magic == b"BNR1" { BannerType::Bnr1 } else { BannerType::Bnr2 };
        let mut b = vec![0u8; kind.file_size() as usize];
        b[..4].copy_from_slice(magic);
        // first banner pixel: opaque white
        b[0x20..0x22].copy_from_slice(&0xFFFFu16.to_be_bytes());
        for (i, (name, desc)) in comments.iter().enumerate() {
            let off = COMMENTS_ADDR as usize + i * COMMENT_SIZE;
            b[off..off + name.len()].copy_from_slice(name.as_bytes());
            b[off + 0xC0..off + 0xC0 + desc.len()].copy_from_slice(desc.as_bytes());
        }
        b
    }

    fn open(data: Vec<u8>, lc: u32) -> RomData<GameCubeBnr> {
        let file = SharedFile::new(MemFile::with_name(data, "opening.bnr"));
        RomData::new(file, &Settings::default().language(lc))
    }

    #[test]
    fn test_detect_needs_full_size() {
        let data = bnr(b"BNR2", &[]);
        let info = DetectInfo::new(&data, 0, data.len() as u64, None);
        assert_eq!(GameCubeBnr::is_supported(&info), Some(1));
        let info = DetectInfo::new(&data, 0, BannerType::Bnr1.file_size(), None);
        assert_eq!(GameCubeBnr::is_supported(&info), None);
    }

    #[test]
    fn test_bnr2_language_and_fallback() {
        let comments = [("Game", "English"), ("Spiel", "Deutsch"), ("", "")];
        let mut rd = open(bnr(b"BNR2", &comments), LC_DE);
        assert_eq!(rd.fields().unwrap().string("Description"), Some("Deutsch"));

        // French slot is entirely empty
        let mut rd = open(bnr(b"BNR2", &comments), LC_FR);
        let f = rd.fields().unwrap();
        assert_eq!(f.string("Game Name"), Some("Game"));
        assert!(f.string("Full Game Name").is_none());
    }

    #[test]
    fn test_bnr1_metadata_and_banner() {
        let mut rd = open(bnr(b"BNR1", &[("Short", "Desc")]), LC_EN);
        assert_eq!(rd.system_name(SystemNameKind::Abbreviation), Some("GCN"));
        let m = rd.metadata().unwrap();
        assert_eq!(m.string(Property::Title), Some("Short"));
        assert_eq!(m.string(Property::Description), Some("Desc"));
        assert!(m.string(Property::Publisher).is_none());

        let img = rd.image(ImageType::IntBanner).unwrap().unwrap();
        assert_eq!((img.width(), img.height()), (96, 32));
        assert_eq!(img.pixel(0, 0), Some(0xFFFFFFFF));
        assert!(matches!(rd.image(ImageType::IntIcon), Err(Error::NotApplicable)));
    }
}
