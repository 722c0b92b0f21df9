//! Commodore 64 SID music (PSID/RSID).
//!
//! ## Header (v1 part, 0x76 bytes, big-endian)
//! ```text
//! [0x00] Magic "PSID" or "RSID"
//! [0x04] Version
//! [0x06] Data offset
//! [0x08] Load address
//! [0x0A] Init address
//! [0x0C] Play address
//! [0x0E] Songs
//! [0x10] Start song
//! [0x12] Speed      (one bit per song)
//! [0x16] Name       (32 bytes, Latin-1, maybe unterminated)
//! [0x36] Author     (32 bytes)
//! [0x56] Copyright  (32 bytes)
//! ```

use std::io::Cursor;

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::fields::{Base, FieldTable, StringFlags};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::metadata::{MetadataSet, Property};
use crate::text::latin1;
use crate::utils::{be_u16, be_u32, bytesa};
use crate::{Error, Result};

pub const HEADER_SIZE: usize = 0x76;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SidType {
    /// PlaySID
    Psid,
    /// RealSID
    Rsid,
}

impl SidType {
    fn from_magic(m: &[u8]) -> Option<Self> {
        match m.get(..4)? {
            b"PSID" => Some(SidType::Psid),
            b"RSID" => Some(SidType::Rsid),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SidType::Psid => "PlaySID",
            SidType::Rsid => "RealSID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sid {
    pub kind: SidType,
    pub version: u16,
    pub data_offset: u16,
    pub load_address: u16,
    pub init_address: u16,
    pub play_address: u16,
    pub songs: u16,
    pub start_song: u16,
    pub speed: u32,
    pub name: String,
    pub author: String,
    pub copyright: String,
}

impl Sid {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let kind = SidType::from_magic(buf).ok_or(Error::BadMagic)?;
        let mut r = Cursor::new(buf);
        r.set_position(4);
        let version = be_u16(&mut r)?;
        let data_offset = be_u16(&mut r)?;
        let load_address = be_u16(&mut r)?;
        let init_address = be_u16(&mut r)?;
        let play_address = be_u16(&mut r)?;
        let songs = be_u16(&mut r)?;
        let start_song = be_u16(&mut r)?;
        let speed = be_u32(&mut r)?;
        let name: [u8; 32] = bytesa(&mut r)?;
        let author: [u8; 32] = bytesa(&mut r)?;
        let copyright: [u8; 32] = bytesa(&mut r)?;
        Ok(Self {
            kind,
            version,
            data_offset,
            load_address,
            init_address,
            play_address,
            songs,
            start_song,
            speed,
            name: latin1(&name),
            author: latin1(&author),
            copyright: latin1(&copyright),
        })
    }
}

impl FormatParser for Sid {
    const CLASS_NAME: &'static str = "SID";
    const FILE_TYPE: FileType = FileType::AudioFile;
    const EXTENSIONS: &'static [&'static str] = &[".sid", ".psid"];
    const MIME_TYPES: &'static [&'static str] = &["audio/prs.sid"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        if info.header_addr != 0 || info.header.len() < HEADER_SIZE {
            return None;
        }
        SidType::from_magic(info.header).map(|t| t as u32)
    }

    fn open(file: &SharedFile, _settings: &Settings) -> Result<Self> {
        let buf = file.read_exact_at(0, HEADER_SIZE)?;
        Self::parse(&buf)
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        pick_name(&["Commodore 64 SID Music", "SID", "SID"], kind)
    }

    fn load_fields(
        &mut self,
        _file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        fields.add_string(settings.tr("SID", "Type"), self.kind.name());
        fields.add_string_numeric(
            settings.tr("RomData", "Version"),
            self.version as u32,
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        for (key, value) in [
            ("Name", &self.name),
            ("Author", &self.author),
            ("Copyright", &self.copyright),
        ] {
            if !value.is_empty() {
                fields.add_string(settings.tr("RomData|Audio", key), value.as_str());
            }
        }
        for (key, addr) in [
            ("Load Address", self.load_address),
            ("Init Address", self.init_address),
            ("Play Address", self.play_address),
        ] {
            fields.add_string_numeric(
                settings.tr("SID", key),
                addr as u32,
                Base::Hex,
                4,
                StringFlags::MONOSPACE,
            );
        }
        fields.add_string_numeric(
            settings.tr("RomData|Audio", "# of Songs"),
            self.songs as u32,
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        fields.add_string_numeric(
            settings.tr("RomData|Audio", "Starting Song #"),
            self.start_song as u32,
            Base::Dec,
            0,
            StringFlags::NONE,
        );
        Ok(())
    }

    fn load_metadata(
        &mut self,
        _file: &SharedFile,
        _settings: &Settings,
        meta: &mut MetadataSet,
    ) -> Result<()> {
        meta.add_string(Property::Title, &self.name);
        meta.add_string(Property::Author, &self.author);
        meta.add_string(Property::Copyright, &self.copyright);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::handler::{FormatHandler, RomData};
    use pretty_assertions::assert_eq;

    pub(crate) fn sid(magic: &[u8; 4], name: &[u8]) -> Vec<u8> {
        let mut b = vec![0u8; HEADER_SIZE + 0x40];
        b[..4].copy_from_slice(magic);
        b[4..6].copy_from_slice(&2u16.to_be_bytes());
        b[6..8].copy_from_slice(&0x7Cu16.to_be_bytes());
        b[0x0A..0x0C].copy_from_slice(&0x1000u16.to_be_bytes());
        b[0x0C..0x0E].copy_from_slice(&0x1003u16.to_be_bytes());
        b[0x0E..0x10].copy_from_slice(&3u16.to_be_bytes());
        b[0x10..0x12].copy_from_slice(&1u16.to_be_bytes());
        // name fills all 32 bytes, no terminator
        b[0x16..0x16 + name.len()].copy_from_slice(name);
        b[0x36..0x3D].copy_from_slice(b"Hubbard");
        b
    }

    #[test]
    fn test_parse() {
        let s = Sid::parse(&sid(b"RSID", &[b'A'; 32])).unwrap();
        assert_eq!(s.kind, SidType::Rsid);
        assert_eq!(s.name.len(), 32);
        assert_eq!(s.author, "Hubbard");
        assert_eq!(s.init_address, 0x1000);
        assert!(matches!(Sid::parse(&sid(b"MSID", b"")), Err(Error::BadMagic)));
    }

    #[test]
    fn test_fields() {
        let data = sid(b"PSID", b"Comm\xE9");
        let mut rd = RomData::<Sid>::new(SharedFile::new(MemFile::new(data)), &Settings::default());
        assert_eq!(rd.system_name(SystemNameKind::Long), Some("Commodore 64 SID Music"));
        let f = rd.fields().unwrap();
        assert_eq!(f.string("Type"), Some("PlaySID"));
        assert_eq!(f.string("Name"), Some("Commé"));
        assert_eq!(f.string("Play Address"), Some("0x1003"));
        assert_eq!(f.string("# of Songs"), Some("3"));
        assert!(f.string("Copyright").is_none());
        let m = rd.metadata().unwrap();
        assert_eq!(m.string(Property::Author), Some("Hubbard"));
    }
}
