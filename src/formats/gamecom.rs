//! Tiger game.com ROM images.
//!
//! The header normally sits at 0x40000; some dumps lack the first
//! 256 KiB and carry it at 0.
//!
//! ## Header (0x20 bytes, little-endian)
//! ```text
//! [0x00] ROM size
//! [0x01] Entry bank
//! [0x02] Entry point  (u16)
//! [0x04] Unknown
//! [0x05] System ID    "TigerDMGC"
//! [0x0E] Icon bank, X, Y
//! [0x11] Title        (9 bytes, Latin-1)
//! [0x1A] Game ID      (u16)
//! [0x1C] Security code
//! [0x1D] Padding
//! ```
//!
//! Icons are cut out of a 256x256 2bpp bank stored column-major, so a
//! 64x64 icon comes out rotated and is turned back while decoding.

use std::rc::Rc;

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::fields::{Base, FieldTable, StringFlags};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::image::{Bitmap, ImageProcessing, ImageSizeDef, ImageType, ImageTypes};
use crate::text::latin1;
use crate::{Error, Result};

pub const HEADER_ADDRESS: u32 = 0x40000;
pub const HEADER_ADDRESS_ALT: u32 = 0;
pub const HEADER_SIZE: u32 = 0x20;
const SYS_ID: &[u8; 9] = b"TigerDMGC";

const ICON_W: u32 = 64;
const ICON_H: u32 = 64;
const BANK_W: u32 = 256;
const BANK_H: u32 = 256;
const BANK_SIZE: u64 = (BANK_W * BANK_H / 4) as u64;

/// White to black.
const PALETTE: [u32; 4] = [0xFFFFFFFF, 0xFFC0C0C0, 0xFF808080, 0xFF000000];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub rom_size: u8,
    pub entry_bank: u8,
    pub entry_point: u16,
    pub icon_bank: u8,
    pub icon_x: u8,
    pub icon_y: u8,
    pub title: String,
    pub game_id: u16,
}

impl Header {
    fn parse(h: &[u8]) -> Result<Self> {
        if h.len() < HEADER_SIZE as usize {
            return Err(Error::Truncated);
        }
        if &h[5..14] != SYS_ID {
            return Err(Error::BadMagic);
        }
        Ok(Self {
            rom_size: h[0],
            entry_bank: h[1],
            entry_point: u16::from_le_bytes([h[2], h[3]]),
            icon_bank: h[0x0E],
            icon_x: h[0x0F],
            icon_y: h[0x10],
            title: latin1(&h[0x11..0x1A]),
            game_id: u16::from_le_bytes([h[0x1A], h[0x1B]]),
        })
    }
}

#[derive(Debug)]
pub struct GameCom {
    pub header: Header,
    /// File offset of ROM address 0; negative when the first 256 KiB are missing.
    base: i64,
}

impl GameCom {
    fn icon_offset(&self) -> Option<u64> {
        let h = &self.header;
        if h.icon_x as u32 > BANK_W - ICON_W || h.icon_y as u32 > BANK_H - ICON_H {
            return None;
        }
        let off = self.base
            + (h.icon_bank as u64 * BANK_SIZE) as i64
            + (h.icon_y / 4) as i64
            + (h.icon_x as u32 * BANK_W / 4) as i64;
        u64::try_from(off).ok()
    }

    pub fn decode_icon(data: &[u8]) -> Result<Bitmap> {
        let stride = (BANK_W / 4) as usize;
        let mut img = Bitmap::new(ICON_W, ICON_H);
        for col in 0..ICON_H {
            let row = crate::utils::slice(data, col as usize * stride, (ICON_W / 4) as usize)?;
            for (i, &b) in row.iter().enumerate() {
                let y = i as u32 * 4;
                for k in 0..4 {
                    let px = (b >> (6 - 2 * k)) & 0x03;
                    img.set(col, y + k, PALETTE[px as usize]);
                }
            }
        }
        Ok(img)
    }
}

impl FormatParser for GameCom {
    const CLASS_NAME: &'static str = "GameCom";
    const FILE_TYPE: FileType = FileType::RomImage;
    const EXTENSIONS: &'static [&'static str] = &[".bin", ".tgc"];
    const MIME_TYPES: &'static [&'static str] = &["application/x-game-com-rom"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        if info.header_addr != HEADER_ADDRESS as u64 && info.header_addr != HEADER_ADDRESS_ALT as u64 {
            return None;
        }
        (info.header.len() >= HEADER_SIZE as usize && &info.header[5..14] == SYS_ID).then_some(0)
    }

    fn open(file: &SharedFile, _settings: &Settings) -> Result<Self> {
        for addr in [HEADER_ADDRESS, HEADER_ADDRESS_ALT] {
            let Ok(buf) = file.read_exact_at(addr as u64, HEADER_SIZE as usize) else {
                continue;
            };
            let info = DetectInfo::new(&buf, addr as u64, file.size(), None);
            if Self::is_supported(&info).is_some() {
                return Ok(Self {
                    header: Header::parse(&buf)?,
                    base: addr as i64 - HEADER_ADDRESS as i64,
                });
            }
        }
        Err(Error::BadMagic)
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        pick_name(&["Tiger game.com", "game.com", "game.com"], kind)
    }

    fn image_types() -> ImageTypes {
        ImageTypes::of(ImageType::IntIcon)
    }

    fn image_sizes(_t: ImageType) -> Vec<ImageSizeDef> {
        vec![ImageSizeDef::new(ICON_W as u16, ICON_H as u16)]
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
        let h = &self.header;
        fields.add_string(settings.tr("GameCom", "Title"), h.title.as_str());
        fields.add_string_numeric(
            settings.tr("GameCom", "Game ID"),
            h.game_id as u32,
            Base::Hex,
            4,
            StringFlags::NONE,
        );
        fields.add_string_numeric(
            settings.tr("GameCom", "Entry Point"),
            h.entry_point as u32,
            Base::Hex,
            4,
            StringFlags::NONE,
        );
        Ok(())
    }

    fn load_image(&mut self, file: &SharedFile, _t: ImageType) -> Result<Option<Rc<Bitmap>>> {
        let Some(off) = self.icon_offset() else {
            return Ok(None);
        };
        let len = ((BANK_W * (ICON_H - 1) + ICON_W) / 4) as usize;
        let data = match file.read_exact_at(off, len) {
            Ok(d) => d,
            Err(Error::Truncated) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(Some(Rc::new(Self::decode_icon(&data)?)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::handler::{FormatHandler, RomData};
    use pretty_assertions::assert_eq;

    fn header(title: &[u8]) -> [u8; HEADER_SIZE as usize] {
        let mut h = [0u8; HEADER_SIZE as usize];
        h[2..4].copy_from_slice(&0x1234u16.to_le_bytes());
        h[5..14].copy_from_slice(SYS_ID);
        // icon in bank 0 at (0, 0), relative to ROM address 0
        h[0x11..0x11 + title.len()].copy_from_slice(title);
        h[0x1A..0x1C].copy_from_slice(&0x0042u16.to_le_bytes());
        h
    }

    /// ROM with the header at `addr`. Icon pixel (0, 1) is black.
    pub(crate) fn rom(addr: u32) -> Vec<u8> {
        let mut b = vec![0u8; addr as usize + 0x8000];
        b[addr as usize..addr as usize + HEADER_SIZE as usize].copy_from_slice(&header(b"GAME"));
        if addr == HEADER_ADDRESS {
            b[0] = 0x30;
        }
        b
    }

    #[test]
    fn test_header_at_0x40000() {
        let file = SharedFile::new(MemFile::with_name(rom(HEADER_ADDRESS), "g.tgc"));
        let mut rd = RomData::<GameCom>::new(file, &Settings::default());
        assert!(rd.is_valid());
        let f = rd.fields().unwrap();
        assert_eq!(f.string("Title"), Some("GAME"));
        assert_eq!(f.string("Game ID"), Some("0x0042"));
        assert_eq!(f.string("Entry Point"), Some("0x1234"));

        let icon = rd.image(ImageType::IntIcon).unwrap().unwrap();
        assert_eq!((icon.width(), icon.height()), (64, 64));
        assert_eq!(icon.pixel(0, 0), Some(PALETTE[0]));
        assert_eq!(icon.pixel(0, 1), Some(PALETTE[3]));
    }

    #[test]
    fn test_header_at_zero_has_no_icon_bank() {
        let file = SharedFile::new(MemFile::with_name(rom(HEADER_ADDRESS_ALT), "g.bin"));
        let mut rd = RomData::<GameCom>::new(file, &Settings::default());
        assert!(rd.is_valid());
        assert_eq!(rd.parser().unwrap().base, -(HEADER_ADDRESS as i64));
        // bank 0 lies before the start of this dump
        assert!(rd.image(ImageType::IntIcon).unwrap().is_none());
    }

    #[test]
    fn test_decode_icon_rotation() {
        let mut data = vec![0u8; ((BANK_W * (ICON_H - 1) + ICON_W) / 4) as usize];
        // second column, pixels 4..8 = shades 0,1,2,3
        data[(BANK_W / 4) as usize + 1] = 0b00_01_10_11;
        let img = GameCom::decode_icon(&data).unwrap();
        assert_eq!(img.pixel(1, 4), Some(PALETTE[0]));
        assert_eq!(img.pixel(1, 5), Some(PALETTE[1]));
        assert_eq!(img.pixel(1, 7), Some(PALETTE[3]));
    }

    #[test]
    fn test_rejects_other_data() {
        let file = SharedFile::new(MemFile::new(vec![0u8; 0x50000]));
        assert!(!RomData::<GameCom>::new(file, &Settings::default()).is_valid());
    }
}
