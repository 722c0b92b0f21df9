//! Game Boy / Game Boy Color ROM images.
//!
//! ## Header (at 0x100, 0x50 bytes)
//! ```text
//! [0x100] Entry point        (4 bytes, usually NOP; JP nnnn)
//! [0x104] Nintendo logo      (0x30 bytes; the first 0x18 are checked)
//! [0x134] Title              (16 bytes; 15 on CGB, 11 when a game ID follows)
//! [0x13F] Game ID            (4 bytes, CGB only)
//! [0x143] CGB flag           (0x80 = supports CGB, 0xC0 = CGB only)
//! [0x144] New publisher code (2 ASCII bytes)
//! [0x146] SGB flag           (0x03 = supports SGB)
//! [0x147] Cartridge type
//! [0x148] ROM size code
//! [0x149] RAM size code
//! [0x14A] Region             (0 = Japan)
//! [0x14B] Old publisher code (0x33 = use the new code)
//! [0x14C] Revision
//! [0x14D] Header checksum    (over 0x134..=0x14C)
//! [0x14E] Global checksum    (u16 BE)
//! ```

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::fields::{Base, FieldTable, StringFlags};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::metadata::{MetadataSet, Property};
use crate::text::cp437;
use crate::utils::slice;
use crate::{Error, Result};

const HEADER_ADDR: usize = 0x100;
const HEADER_SIZE: usize = 0x50;

pub const NINTENDO_LOGO: [u8; 0x18] = [
    0xCE, 0xED, 0x66, 0x66, 0xCC, 0x0D, 0x00, 0x0B, 0x03, 0x73, 0x00, 0x83, 0x00, 0x0C, 0x00, 0x0D,
    0x00, 0x08, 0x11, 0x1F, 0x88, 0x89, 0x00, 0x0E,
];

/// Systems a ROM runs on.
pub const SYSTEM_DMG: u32 = 1 << 0;
pub const SYSTEM_SGB: u32 = 1 << 1;
pub const SYSTEM_CGB: u32 = 1 << 2;

const FEATURE_RAM: u8 = 1 << 0;
const FEATURE_BATTERY: u8 = 1 << 1;
const FEATURE_TIMER: u8 = 1 << 2;
const FEATURE_RUMBLE: u8 = 1 << 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hardware {
    Unknown,
    Rom,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc4,
    Mbc5,
    Mbc6,
    Mbc7,
    Mmm01,
    HuC1,
    HuC3,
    Tama5,
    Camera,
}

impl Hardware {
    fn name(self) -> &'static str {
        match self {
            Hardware::Unknown => "Unknown",
            Hardware::Rom => "ROM",
            Hardware::Mbc1 => "MBC1",
            Hardware::Mbc2 => "MBC2",
            Hardware::Mbc3 => "MBC3",
            Hardware::Mbc4 => "MBC4",
            Hardware::Mbc5 => "MBC5",
            Hardware::Mbc6 => "MBC6",
            Hardware::Mbc7 => "MBC7",
            Hardware::Mmm01 => "MMM01",
            Hardware::HuC1 => "HuC1",
            Hardware::HuC3 => "HuC3",
            Hardware::Tama5 => "TAMA5",
            Hardware::Camera => "POCKET CAMERA",
        }
    }
}

const RAM_BAT: u8 = FEATURE_RAM | FEATURE_BATTERY;

/// Cartridge types 0x00..=0x22.
const CART_TYPES_START: [(Hardware, u8); 0x23] = {
    use Hardware::*;
    [
        (Rom, 0),
        (Mbc1, 0),
        (Mbc1, FEATURE_RAM),
        (Mbc1, RAM_BAT),
        (Unknown, 0),
        (Mbc2, 0),
        (Mbc2, FEATURE_BATTERY),
        (Unknown, 0),
        (Rom, FEATURE_RAM),
        (Rom, RAM_BAT),
        (Unknown, 0),
        (Mmm01, 0),
        (Mmm01, FEATURE_RAM),
        (Mmm01, RAM_BAT),
        (Unknown, 0),
        (Mbc3, FEATURE_TIMER | FEATURE_BATTERY),
        (Mbc3, FEATURE_TIMER | RAM_BAT),
        (Mbc3, 0),
        (Mbc3, FEATURE_RAM),
        (Mbc3, RAM_BAT),
        (Unknown, 0),
        (Mbc4, 0),
        (Mbc4, FEATURE_RAM),
        (Mbc4, RAM_BAT),
        (Unknown, 0),
        (Mbc5, 0),
        (Mbc5, FEATURE_RAM),
        (Mbc5, RAM_BAT),
        (Mbc5, FEATURE_RUMBLE),
        (Mbc5, FEATURE_RUMBLE | FEATURE_RAM),
        (Mbc5, FEATURE_RUMBLE | RAM_BAT),
        (Unknown, 0),
        (Mbc6, 0),
        (Unknown, 0),
        (Mbc7, FEATURE_RUMBLE | RAM_BAT),
    ]
};

/// Cartridge types 0xFC..=0xFF.
const CART_TYPES_END: [(Hardware, u8); 4] = [
    (Hardware::Camera, 0),
    (Hardware::Tama5, 0),
    (Hardware::HuC3, 0),
    (Hardware::HuC1, RAM_BAT),
];

fn cart_type(t: u8) -> (Hardware, u8) {
    let end_start = 0x100 - CART_TYPES_END.len();
    match t as usize {
        i if i < CART_TYPES_START.len() => CART_TYPES_START[i],
        i if i >= end_start => CART_TYPES_END[i - end_start],
        _ => (Hardware::Unknown, 0),
    }
}

/// ROM size in KiB.
fn rom_size_kib(code: u8) -> Option<u32> {
    match code {
        0..=7 => Some(32 << code),
        0x52 => Some(1152),
        0x53 => Some(1280),
        0x54 => Some(1536),
        _ => None,
    }
}

const RAM_SIZE_KIB: [u32; 6] = [0, 2, 8, 32, 128, 64];

/// Decoded cartridge header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub entry: [u8; 4],
    pub title: [u8; 16],
    pub new_publisher: [u8; 2],
    pub sgb_flag: u8,
    pub cart_type: u8,
    pub rom_size: u8,
    pub ram_size: u8,
    pub region: u8,
    pub old_publisher: u8,
    pub version: u8,
    pub header_checksum: u8,
    pub global_checksum: u16,
    raw: Vec<u8>,
}

impl Header {
    fn parse(buf: &[u8]) -> Result<Self> {
        let h = slice(buf, 0, HEADER_SIZE)?;
        let mut entry = [0u8; 4];
        entry.copy_from_slice(&h[0..4]);
        let mut title = [0u8; 16];
        title.copy_from_slice(&h[0x34..0x44]);
        Ok(Self {
            entry,
            title,
            new_publisher: [h[0x44], h[0x45]],
            sgb_flag: h[0x46],
            cart_type: h[0x47],
            rom_size: h[0x48],
            ram_size: h[0x49],
            region: h[0x4A],
            old_publisher: h[0x4B],
            version: h[0x4C],
            header_checksum: h[0x4D],
            global_checksum: u16::from_be_bytes([h[0x4E], h[0x4F]]),
            raw: h.to_vec(),
        })
    }

    pub fn cgb_flag(&self) -> u8 {
        self.title[15]
    }

    /// `SYSTEM_*` bits.
    pub fn systems(&self) -> u32 {
        let cgb = self.cgb_flag();
        let mut sys = if cgb & 0x80 != 0 {
            SYSTEM_CGB | if cgb & 0x40 == 0 { SYSTEM_DMG } else { 0 }
        } else {
            SYSTEM_DMG
        };
        if self.old_publisher == 0x33 && self.sgb_flag == 0x03 {
            sys |= SYSTEM_SGB;
        }
        sys
    }

    /// Checksum the boot ROM computes over 0x134..=0x14C.
    pub fn computed_checksum(&self) -> u8 {
        self.raw[0x34..0x4D]
            .iter()
            .fold(0xE7u8, |acc, &b| acc.wrapping_sub(b))
    }

    /// Title and game ID. Later games take bytes from the title for the
    /// CGB flag and then for a four-character ID; the ID is preferred.
    pub fn title_and_game_id(&self) -> (String, Option<String>) {
        let cgb = self.cgb_flag();
        let t = &self.title;
        let title = if cgb < 0x80 {
            cp437(&t[..16])
        } else if cgb & 0x3F == 0 && has_game_id(t) {
            let mut id: String = t[11..15].iter().map(|&b| b as char).collect();
            if self.old_publisher == 0x33 {
                id.extend(self.new_publisher.iter().map(|&b| b as char));
            } else {
                id.push_str(&format!("{:02X}", self.old_publisher));
            }
            return (trim_title(cp437(&t[..11])), Some(id));
        } else {
            cp437(&t[..15])
        };
        (trim_title(title), None)
    }

    fn publisher(&self) -> String {
        if self.old_publisher == 0x33 {
            let [a, b] = self.new_publisher;
            match &self.new_publisher {
                b"01" => "Nintendo".to_owned(),
                _ if a.is_ascii_alphanumeric() && b.is_ascii_alphanumeric() => {
                    format!("Unknown ({}{})", a as char, b as char)
                }
                _ => format!("Unknown ({a:02X} {b:02X})"),
            }
        } else if self.old_publisher == 0x01 {
            "Nintendo".to_owned()
        } else {
            format!("Unknown ({:02X})", self.old_publisher)
        }
    }
}

/// `title[11..15]`: `[ABV]`, two uppercase-or-digit bytes, then a region byte.
fn has_game_id(t: &[u8; 16]) -> bool {
    let ok = |b: u8| b.is_ascii_uppercase() || b.is_ascii_digit();
    matches!(t[11], b'A' | b'B' | b'V') && ok(t[12]) && ok(t[13]) && b"ADEFGHIJKPSXY".contains(&t[14])
}

/// Drop trailing spaces unless the title starts with one.
fn trim_title(mut s: String) -> String {
    if !s.starts_with(' ') {
        s.truncate(s.trim_end_matches(' ').len());
    }
    s
}

fn entry_point(entry: &[u8; 4]) -> Option<u16> {
    match entry {
        [0x00 | 0xF3 | 0x7F | 0x3F, 0xC3, lo, hi] => Some(u16::from_le_bytes([*lo, *hi])),
        [0xC3, lo, hi, _] => Some(u16::from_le_bytes([*lo, *hi])),
        [0x18, disp, _, _] => Some((0x102i32 + *disp as i8 as i32) as u16),
        _ => None,
    }
}

fn kib_with_banks(kib: u32, bank_kib: u32) -> String {
    let banks = kib / bank_kib;
    let unit = if banks == 1 { "bank" } else { "banks" };
    format!("{kib} KiB ({banks} {unit})")
}

#[derive(Debug)]
pub struct Dmg {
    pub header: Header,
    cgb: bool,
}

impl FormatParser for Dmg {
    const CLASS_NAME: &'static str = "DMG";
    const FILE_TYPE: FileType = FileType::RomImage;
    const EXTENSIONS: &'static [&'static str] = &[".gb", ".sgb", ".sgb2", ".gbc", ".cgb"];
    const MIME_TYPES: &'static [&'static str] =
        &["application/x-gameboy-rom", "application/x-gameboy-color-rom"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        if info.header_addr != 0 || info.header.len() < HEADER_ADDR + HEADER_SIZE {
            return None;
        }
        let h = &info.header[HEADER_ADDR..];
        if h[4..4 + NINTENDO_LOGO.len()] != NINTENDO_LOGO {
            return None;
        }
        Some(if h[0x43] & 0x80 != 0 { 1 } else { 0 })
    }

    fn open(file: &SharedFile, _settings: &Settings) -> Result<Self> {
        let buf = file.read_exact_at(0, HEADER_ADDR + HEADER_SIZE)?;
        let kind = Self::is_supported(&DetectInfo::new(&buf, 0, file.size(), None))
            .ok_or(Error::BadMagic)?;
        Ok(Self {
            header: Header::parse(&buf[HEADER_ADDR..])?,
            cgb: kind == 1,
        })
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        if self.cgb {
            pick_name(&["Nintendo Game Boy Color", "Game Boy Color", "GBC"], kind)
        } else {
            pick_name(&["Nintendo Game Boy", "Game Boy", "GB"], kind)
        }
    }

    fn load_fields(
        &mut self,
        _file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        let h = &self.header;
        let tr = |key: &str| settings.tr("DMG", key);

        let (title, game_id) = h.title_and_game_id();
        fields.add_string(settings.tr("RomData", "Title"), title);
        fields.add_string(
            tr("Game ID"),
            game_id.unwrap_or_else(|| settings.tr("RomData", "Unknown")),
        );

        let systems = h.systems();
        fields.add_bitfield(tr("System"), ["DMG", "SGB", "CGB"], 0, systems);
        let tab = if systems & SYSTEM_CGB != 0 {
            "CGB"
        } else if systems & SYSTEM_SGB != 0 {
            "SGB"
        } else {
            "DMG"
        };
        fields.set_tab_name(0, tab);

        match entry_point(&h.entry) {
            Some(addr) => fields.add_string_numeric(
                tr("Entry Point"),
                addr as u32,
                Base::Hex,
                4,
                StringFlags::MONOSPACE,
            ),
            None => fields.add_string_hexdump(tr("Entry Point"), &h.entry),
        };

        fields.add_string(settings.tr("RomData", "Publisher"), h.publisher());

        let (hw, features) = cart_type(h.cart_type);
        fields.add_string(tr("Hardware"), hw.name());
        let feature_names = ["RAM", "Battery", "Timer", "Rumble"]
            .map(|n| settings.tr("DMG|Features", n));
        fields.add_bitfield(tr("Features"), feature_names, 0, features as u32);

        let rom = match rom_size_kib(h.rom_size) {
            None => settings.tr("RomData", "Unknown"),
            Some(kib) if kib > 32 => kib_with_banks(kib, 16),
            Some(kib) => format!("{kib} KiB"),
        };
        fields.add_string(tr("ROM Size"), rom);

        let ram = match RAM_SIZE_KIB.get(h.ram_size as usize) {
            None => settings.tr("RomData", "Unknown"),
            Some(0) if hw == Hardware::Mbc2 => "512 x 4 bits".to_owned(),
            Some(0) => tr("No RAM"),
            Some(&kib) if kib > 8 => kib_with_banks(kib, 8),
            Some(&kib) => format!("{kib} KiB"),
        };
        fields.add_string(tr("RAM Size"), ram);

        let region = match h.region {
            0 => settings.tr("Region|DMG", "Japanese"),
            1 => settings.tr("Region|DMG", "Non-Japanese"),
            r => format!("0x{r:02X} (INVALID)"),
        };
        fields.add_string(settings.tr("RomData", "Region Code"), region);

        fields.add_string_numeric(
            settings.tr("RomData", "Revision"),
            h.version as u32,
            Base::Dec,
            2,
            StringFlags::NONE,
        );

        let expected = h.computed_checksum();
        let checksum = if expected == h.header_checksum {
            format!("0x{expected:02X} (valid)")
        } else {
            format!(
                "0x{:02X} (INVALID; should be 0x{expected:02X})",
                h.header_checksum
            )
        };
        fields.add_string_flags(
            settings.tr("RomData", "Checksum"),
            checksum,
            if expected == h.header_checksum {
                StringFlags::NONE
            } else {
                StringFlags::WARNING
            },
        );
        Ok(())
    }

    fn load_metadata(
        &mut self,
        _file: &SharedFile,
        _settings: &Settings,
        meta: &mut MetadataSet,
    ) -> Result<()> {
        let (title, _) = self.header.title_and_game_id();
        meta.add_string(Property::Title, title);
        meta.add_string(Property::Publisher, self.header.publisher());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::file::MemFile;
    use crate::handler::{FormatHandler, RomData};
    use pretty_assertions::assert_eq;

    /// A 32 KiB ROM with a valid logo and checksum.
    pub(crate) fn rom(title: &[u8], cgb: u8) -> Vec<u8> {
        let mut r = vec![0u8; 0x8000];
        r[0x100..0x104].copy_from_slice(&[0x00, 0xC3, 0x50, 0x01]);
        r[0x104..0x11C].copy_from_slice(&NINTENDO_LOGO);
        r[0x134..0x134 + title.len()].copy_from_slice(title);
        r[0x143] = cgb;
        r[0x144..0x146].copy_from_slice(b"01");
        r[0x147] = 0x03;
        r[0x148] = 0x02;
        r[0x149] = 0x02;
        r[0x14B] = 0x33;
        let sum = r[0x134..0x14D].iter().fold(0xE7u8, |a, &b| a.wrapping_sub(b));
        r[0x14D] = sum;
        r
    }

    fn open(data: Vec<u8>) -> RomData<Dmg> {
        RomData::new(SharedFile::new(MemFile::with_name(data, "t.gb")), &Settings::default())
    }

    #[test]
    fn test_dmg_fields() {
        let mut rd = open(rom(b"TETRIS", 0));
        assert!(rd.is_valid());
        assert_eq!(rd.system_name(SystemNameKind::Short), Some("Game Boy"));
        let f = rd.fields().unwrap();
        assert_eq!(f.tab_name(0), Some("DMG"));
        assert_eq!(f.string("Title"), Some("TETRIS"));
        assert_eq!(f.string("Game ID"), Some("Unknown"));
        assert_eq!(f.string("Entry Point"), Some("0x0150"));
        assert_eq!(f.string("Publisher"), Some("Nintendo"));
        assert_eq!(f.string("Hardware"), Some("MBC1"));
        assert_eq!(f.string("ROM Size"), Some("128 KiB (8 banks)"));
        assert_eq!(f.string("RAM Size"), Some("8 KiB"));
        assert_eq!(f.string("Region Code"), Some("Japanese"));
        assert!(f.string("Checksum").unwrap().ends_with("(valid)"));
    }

    #[test]
    fn test_cgb_game_id() {
        let mut rd = open(rom(b"POKEMON YELAPSE", 0x80));
        assert_eq!(rd.system_name(SystemNameKind::Abbreviation), Some("GBC"));
        let f = rd.fields().unwrap();
        assert_eq!(f.tab_name(0), Some("CGB"));
        assert_eq!(f.string("Title"), Some("POKEMON YEL"));
        assert_eq!(f.string("Game ID"), Some("APSE01"));
    }

    #[test]
    fn test_bad_checksum_flagged() {
        let mut data = rom(b"X", 0);
        data[0x14D] ^= 0xFF;
        let mut rd = open(data);
        let s = rd.fields().unwrap().string("Checksum").unwrap().to_owned();
        assert!(s.contains("INVALID; should be"));
    }

    #[test]
    fn test_entry_point_forms() {
        assert_eq!(entry_point(&[0xC3, 0x00, 0x02, 0]), Some(0x200));
        assert_eq!(entry_point(&[0x18, 0xFE, 0, 0]), Some(0x100));
        assert_eq!(entry_point(&[0xFF, 0xFF, 0, 0]), None);
    }

    #[test]
    fn test_cart_type_tables() {
        assert_eq!(cart_type(0xFC).0, Hardware::Camera);
        assert_eq!(cart_type(0xFF), (Hardware::HuC1, RAM_BAT));
        assert_eq!(cart_type(0x50).0, Hardware::Unknown);
        assert_eq!(rom_size_kib(0x53), Some(1280));
        assert_eq!(rom_size_kib(0x08), None);
    }

    #[test]
    fn test_short_file_rejected() {
        let data = rom(b"X", 0)[..0x140].to_vec();
        assert!(!open(data).is_valid());
    }
}
