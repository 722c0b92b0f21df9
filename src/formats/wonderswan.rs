//! Bandai WonderSwan / WonderSwan Color ROM images.
//!
//! The header lives in the last 16 bytes of the ROM:
//!
//! ```text
//! [0x0] Entry point   (JMPF, 5 bytes)
//! [0x5] Zero
//! [0x6] Publisher
//! [0x7] System ID     0 = WonderSwan, 1 = Color
//! [0x8] Game ID
//! [0x9] Revision
//! [0xA] ROM size
//! [0xB] Save type
//! [0xC] Flags
//! [0xD] RTC present
//! [0xE] Checksum      (u16 LE)
//! ```

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::fields::{Base, FieldTable, StringFlags};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::{Error, Result};

pub const FOOTER_SIZE: usize = 16;
const MIN_SIZE: u64 = 16 * 1024;
const MAX_SIZE: u64 = 16 * 1024 * 1024;

const FLAG_VERTICAL: u8 = 1 << 0;
const FLAG_BUS_8BIT: u8 = 1 << 2;
const FLAG_SPEED_1CYCLE: u8 = 1 << 3;

/// ROM size codes, in KiB.
const ROM_SIZE_KIB: [u32; 10] = [128, 256, 512, 1024, 2048, 3072, 4096, 6144, 8192, 16384];
/// SRAM size codes 0x00..=0x05, in KiB.
const SRAM_SIZE_KIB: [u32; 6] = [0, 8, 32, 128, 256, 512];

/// Known publisher codes.
const PUBLISHERS: &[(u8, &str, &str)] = &[
    (0x01, "BAN", "Bandai"),
    (0x02, "TAT", "Taito"),
    (0x03, "TMY", "Tomy"),
    (0x04, "KEX", "Koei"),
    (0x05, "DTE", "Data East"),
    (0x06, "AAE", "Asmik Ace"),
    (0x07, "MDE", "Media Entertainment"),
    (0x08, "NHB", "Nichibutsu"),
    (0x0A, "CCJ", "Coconuts Japan"),
    (0x0B, "SUM", "Sammy"),
    (0x0C, "SUN", "Sunsoft"),
    (0x0E, "BPR", "Banpresto"),
    (0x10, "JLC", "Jaleco"),
    (0x11, "MGA", "Imagineer"),
    (0x12, "KNM", "Konami"),
    (0x22, "HAL", "HAL Laboratory"),
    (0x28, "SQR", "Square"),
    (0x2D, "NMC", "Namco"),
    (0x36, "CAP", "Capcom"),
];

fn publisher(code: u8) -> Option<(&'static str, &'static str)> {
    PUBLISHERS
        .iter()
        .find(|(c, ..)| *c == code)
        .map(|&(_, abbr, name)| (abbr, name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SystemId {
    Original = 0,
    Color = 1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    pub zero: u8,
    pub publisher: u8,
    pub system_id: u8,
    pub game_id: u8,
    pub revision: u8,
    pub rom_size: u8,
    pub save_type: u8,
    pub flags: u8,
    pub rtc_present: u8,
    pub checksum: u16,
}

impl Footer {
    pub fn parse(f: &[u8]) -> Result<Self> {
        let f: &[u8; FOOTER_SIZE] = f.try_into().map_err(|_| Error::Truncated)?;
        Ok(Self {
            zero: f[0x5],
            publisher: f[0x6],
            system_id: f[0x7],
            game_id: f[0x8],
            revision: f[0x9],
            rom_size: f[0xA],
            save_type: f[0xB],
            flags: f[0xC],
            rtc_present: f[0xD],
            checksum: u16::from_le_bytes([f[0xE], f[0xF]]),
        })
    }

    fn system(&self) -> Option<SystemId> {
        match self.system_id {
            0 => Some(SystemId::Original),
            1 => Some(SystemId::Color),
            _ => None,
        }
    }

    /// `SWJ-BANC01`, `SWJ-BAN001`; unknown publishers are shown by number.
    pub fn game_id_string(&self) -> String {
        let code = match publisher(self.publisher) {
            Some((abbr, _)) => abbr.to_string(),
            None => format!("{:03}", self.publisher),
        };
        match self.system() {
            Some(SystemId::Color) => format!("SWJ-{code}C{:02X}", self.game_id),
            _ => format!("SWJ-{code}{:03X}", self.game_id),
        }
    }

    /// Human-readable save memory description; `None` if there is none.
    pub fn save_memory(&self) -> Option<String> {
        match self.save_type {
            0x01..=0x05 => Some(format!("{} KiB (SRAM)", SRAM_SIZE_KIB[self.save_type as usize])),
            0x10 => Some("128 bytes (EEPROM)".to_string()),
            0x20 => Some("2 KiB (EEPROM)".to_string()),
            0x50 => Some("1 KiB (EEPROM)".to_string()),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct WonderSwan {
    pub footer: Footer,
    pub system: SystemId,
}

impl FormatParser for WonderSwan {
    const CLASS_NAME: &'static str = "WonderSwan";
    const FILE_TYPE: FileType = FileType::RomImage;
    const EXTENSIONS: &'static [&'static str] = &[".ws", ".wsc"];
    const MIME_TYPES: &'static [&'static str] = &[
        "application/x-wonderswan-rom",
        "application/x-wonderswan-color-rom",
    ];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        if !info.ext_is(Self::EXTENSIONS) {
            return None;
        }
        let size = info.file_size;
        if !size.is_power_of_two() || !(MIN_SIZE..=MAX_SIZE).contains(&size) {
            return None;
        }
        let off = (size - FOOTER_SIZE as u64).checked_sub(info.header_addr)? as usize;
        let raw = info.header.get(off..off + FOOTER_SIZE)?;
        let footer = Footer::parse(raw).ok()?;
        if footer.zero != 0 {
            return None;
        }
        footer.system().map(|s| s as u32)
    }

    fn open(file: &SharedFile, _settings: &Settings) -> Result<Self> {
        let size = file.size();
        let addr = size.checked_sub(FOOTER_SIZE as u64).ok_or(Error::Truncated)?;
        let raw = file.read_exact_at(addr, FOOTER_SIZE)?;
        let ext = file.extension();
        let info = DetectInfo::new(&raw, addr, size, ext.as_deref());
        let system = match Self::is_supported(&info) {
            Some(0) => SystemId::Original,
            Some(_) => SystemId::Color,
            None => return Err(Error::UnsupportedFormat),
        };
        Ok(Self {
            footer: Footer::parse(&raw)?,
            system,
        })
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        match self.system {
            SystemId::Original => pick_name(&["Bandai WonderSwan", "WonderSwan", "WS"], kind),
            SystemId::Color => pick_name(&["Bandai WonderSwan Color", "WonderSwan Color", "WSC"], kind),
        }
    }

    fn load_fields(
        &mut self,
        _file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        let tr = |key: &str| settings.tr("WonderSwan", key);
        let f = &self.footer;

        fields.add_string(tr("Game ID"), f.game_id_string());
        fields.add_string_numeric(tr("Revision"), f.revision as u32, Base::Dec, 2, StringFlags::NONE);
        let pub_name = match publisher(f.publisher) {
            Some((_, name)) => name.to_string(),
            None => format!("Unknown ({})", f.publisher),
        };
        fields.add_string(tr("Publisher"), pub_name);

        let system = match self.system {
            SystemId::Original => 1,
            SystemId::Color => 3,
        };
        fields.add_bitfield(tr("System"), ["WonderSwan", "WonderSwan Color"], 0, system);

        let rom = match ROM_SIZE_KIB.get(f.rom_size as usize) {
            Some(kib) => format!("{kib} KiB"),
            None => format!("Unknown ({})", f.rom_size),
        };
        fields.add_string(tr("ROM Size"), rom);
        fields.add_string(
            tr("Save Memory"),
            f.save_memory().unwrap_or_else(|| tr("None")),
        );
        fields.add_bitfield(tr("Features"), ["RTC Present"], 0, (f.rtc_present != 0) as u32);

        let pick = |bit: u8, set: &str, clear: &str| {
            if f.flags & bit != 0 { tr(set) } else { tr(clear) }
        };
        fields.add_string(tr("Orientation"), pick(FLAG_VERTICAL, "Vertical", "Horizontal"));
        fields.add_string(tr("Bus Width"), pick(FLAG_BUS_8BIT, "8-bit", "16-bit"));
        fields.add_string(
            tr("ROM Access Speed"),
            pick(FLAG_SPEED_1CYCLE, "1 cycle", "3 cycles"),
        );
        fields.add_string_numeric(
            tr("Checksum"),
            f.checksum as u32,
            Base::Hex,
            4,
            StringFlags::MONOSPACE,
        );
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::handler::{FormatHandler, RomData};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// 64 KiB ROM with a footer for `system_id`.
    pub(crate) fn rom(system_id: u8) -> Vec<u8> {
        let mut b = vec![0xFFu8; 64 * 1024];
        let n = b.len();
        let f = &mut b[n - FOOTER_SIZE..];
        f[..5].copy_from_slice(&[0xEA, 0x00, 0x00, 0x00, 0xF0]);
        f[0x5] = 0;
        f[0x6] = 0x01;
        f[0x7] = system_id;
        f[0x8] = 0x1B;
        f[0x9] = 0;
        f[0xA] = 2;
        f[0xB] = 0x01;
        f[0xC] = FLAG_VERTICAL | FLAG_SPEED_1CYCLE;
        f[0xD] = 1;
        f[0xE..].copy_from_slice(&0xBEEFu16.to_le_bytes());
        b
    }

    fn info<'a>(data: &'a [u8], ext: &'a str) -> DetectInfo<'a> {
        DetectInfo::new(data, 0, data.len() as u64, Some(ext))
    }

    #[rstest]
    #[case(0, ".ws", Some(0))]
    #[case(1, ".WSC", Some(1))]
    #[case(2, ".ws", None)]
    #[case(0, ".bin", None)]
    fn test_is_supported(#[case] system_id: u8, #[case] ext: &str, #[case] want: Option<u32>) {
        let data = rom(system_id);
        assert_eq!(WonderSwan::is_supported(&info(&data, ext)), want);
    }

    #[test]
    fn test_rejects_bad_size_and_zero() {
        let mut data = rom(0);
        data.push(0);
        assert_eq!(WonderSwan::is_supported(&info(&data, ".ws")), None);

        let mut data = rom(0);
        let n = data.len();
        data[n - FOOTER_SIZE + 5] = 1;
        assert_eq!(WonderSwan::is_supported(&info(&data, ".ws")), None);
    }

    #[test]
    fn test_footer_window() {
        let data = rom(1);
        let addr = data.len() - 1024;
        let win = DetectInfo::new(&data[addr..], addr as u64, data.len() as u64, Some(".wsc"));
        assert_eq!(WonderSwan::is_supported(&win), Some(1));
    }

    #[test]
    fn test_fields() {
        let file = SharedFile::new(MemFile::with_name(rom(1), "game.wsc"));
        let mut rd = RomData::<WonderSwan>::new(file, &Settings::default());
        assert!(rd.is_valid());
        assert_eq!(rd.system_name(SystemNameKind::Abbreviation), Some("WSC"));
        let f = rd.fields().unwrap();
        assert_eq!(f.string("Game ID"), Some("SWJ-BANC1B"));
        assert_eq!(f.string("Publisher"), Some("Bandai"));
        assert_eq!(f.string("ROM Size"), Some("512 KiB"));
        assert_eq!(f.string("Save Memory"), Some("8 KiB (SRAM)"));
        assert_eq!(f.string("Orientation"), Some("Vertical"));
        assert_eq!(f.string("Bus Width"), Some("16-bit"));
        assert_eq!(f.string("ROM Access Speed"), Some("1 cycle"));
        assert_eq!(f.string("Checksum"), Some("0xBEEF"));
    }

    #[test]
    fn test_game_id_unknown_publisher() {
        let mut data = rom(0);
        let n = data.len();
        data[n - FOOTER_SIZE + 6] = 0x7F;
        let footer = Footer::parse(&data[n - FOOTER_SIZE..]).unwrap();
        assert_eq!(footer.game_id_string(), "SWJ-12701B");
    }
}
