//! GBS - Game Boy Sound System rips.
//!
//! ## Header (0x70 bytes, little-endian)
//! ```text
//! [0x00] Magic "GBS" + version (0x01)
//! [0x04] Track count
//! [0x05] Default track (1-based)
//! [0x06] Load address   ($0400-$7FFF)
//! [0x08] Init address
//! [0x0A] Play address
//! [0x0C] Stack pointer
//! [0x0E] Timer modulo
//! [0x0F] Timer control
//! [0x10] Title          (32 bytes, NUL-padded)
//! [0x30] Composer       (32 bytes)
//! [0x50] Copyright      (32 bytes)
//! ```

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::fields::{Base, FieldTable, StringFlags};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::metadata::{MetadataSet, Property};
use crate::text::latin1;
use crate::utils::{bytesa, le_u16, u8};
use crate::{Error, Result};

pub const HEADER_SIZE: usize = 0x70;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gbs {
    pub version: u8,
    pub track_count: u8,
    pub default_track: u8,
    pub load_address: u16,
    pub init_address: u16,
    pub play_address: u16,
    pub stack_pointer: u16,
    pub timer_modulo: u8,
    pub timer_control: u8,
    pub title: String,
    pub composer: String,
    pub copyright: String,
}

impl Gbs {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut r = std::io::Cursor::new(buf);
        let m: [u8; 3] = bytesa(&mut r)?;
        if &m != b"GBS" {
            return Err(Error::BadMagic);
        }
        let version = u8(&mut r)?;
        if version != 1 {
            return Err(Error::UnsupportedVersion(version as u32));
        }
        let track_count = u8(&mut r)?;
        let default_track = u8(&mut r)?;
        let load_address = le_u16(&mut r)?;
        let init_address = le_u16(&mut r)?;
        let play_address = le_u16(&mut r)?;
        let stack_pointer = le_u16(&mut r)?;
        let timer_modulo = u8(&mut r)?;
        let timer_control = u8(&mut r)?;
        let title: [u8; 32] = bytesa(&mut r)?;
        let composer: [u8; 32] = bytesa(&mut r)?;
        let copyright: [u8; 32] = bytesa(&mut r)?;
        Ok(Self {
            version,
            track_count,
            default_track,
            load_address,
            init_address,
            play_address,
            stack_pointer,
            timer_modulo,
            timer_control,
            title: latin1(&title),
            composer: latin1(&composer),
            copyright: latin1(&copyright),
        })
    }
}

impl FormatParser for Gbs {
    const CLASS_NAME: &'static str = "GBS";
    const FILE_TYPE: FileType = FileType::AudioFile;
    const EXTENSIONS: &'static [&'static str] = &[".gbs"];
    const MIME_TYPES: &'static [&'static str] = &["audio/x-gbs"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        (info.header_addr == 0
            && info.header.len() >= HEADER_SIZE
            && info.header.starts_with(b"GBS\x01"))
        .then_some(0)
    }

    fn open(file: &SharedFile, _settings: &Settings) -> Result<Self> {
        let buf = file.read_exact_at(0, HEADER_SIZE)?;
        Self::parse(&buf)
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        pick_name(&["Game Boy Sound System", "GBS", "GBS"], kind)
    }

    fn load_fields(
        &mut self,
        _file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        let tr = |key: &str| settings.tr("GBS", key);
        fields.add_string_numeric(tr("Version"), self.version as u32, Base::Dec, 0, StringFlags::NONE);
        fields.add_string_numeric(
            tr("Track Count"),
            self.track_count as u32,
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        fields.add_string_numeric(
            tr("Default Track #"),
            self.default_track as u32,
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        for (name, value) in [
            (settings.tr("RomData|Audio", "Title"), &self.title),
            (settings.tr("RomData|Audio", "Composer"), &self.composer),
            (settings.tr("RomData|Audio", "Copyright"), &self.copyright),
        ] {
            if !value.is_empty() {
                fields.add_string_flags(name, value.as_str(), StringFlags::TRIM_END);
            }
        }
        for (key, addr) in [
            ("Load Address", self.load_address),
            ("Init Address", self.init_address),
            ("Play Address", self.play_address),
            ("Stack Pointer", self.stack_pointer),
        ] {
            fields.add_string_numeric(tr(key), addr as u32, Base::Hex, 4, StringFlags::MONOSPACE);
        }
        fields.add_string_numeric(
            tr("Timer Modulo"),
            self.timer_modulo as u32,
            Base::Hex,
            2,
            StringFlags::MONOSPACE,
        );
        fields.add_string_numeric(
            tr("Timer Control"),
            self.timer_control as u32,
            Base::Hex,
            2,
            StringFlags::MONOSPACE,
        );
        Ok(())
    }

    fn load_metadata(
        &mut self,
        _file: &SharedFile,
        _settings: &Settings,
        meta: &mut MetadataSet,
    ) -> Result<()> {
        meta.add_string(Property::Title, &self.title);
        meta.add_string(Property::Composer, &self.composer);
        meta.add_string(Property::Copyright, &self.copyright);
        Ok(())
    }
}
