//! VGM - Video Game Music logs.
//!
//! ## Header (little-endian; later versions append fields)
//! ```text
//! [0x00] Magic "Vgm "
//! [0x04] EOF offset        (relative to 0x04)
//! [0x08] Version           (BCD, 0x0151 = 1.51)
//! [0x0C] SN76489 clock     (bits 30-31 set = T6W28)
//! [0x10] YM2413 clock
//! [0x14] GD3 offset        (relative to 0x14)
//! [0x18] Total samples     (44100 Hz)
//! [0x1C] Loop offset
//! [0x20] Loop samples
//! [0x24] Frame rate        [1.01]
//! [0x28] SN76489 LFSR feedback (u16), shift width (u8) [1.10]
//! [0x2C] YM2612 clock      [1.10]
//! [0x30] YM2151 clock      [1.10]
//! ```
//!
//! ## GD3 tag block
//! ```text
//! [0x00] Magic "Gd3 "
//! [0x04] Version  (>= 0x0100)
//! [0x08] Length   (bytes of string data that follow)
//! [0x0C] NUL-terminated UTF-16LE strings:
//!        track (en, ja), game (en, ja), system (en, ja), composer (en, ja),
//!        release date, ripper, notes
//! ```

use std::io::Cursor;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::fields::{Base, FieldTable, StringFlags};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::metadata::{MetadataSet, Property};
use crate::utils::{le_u16, le_u32, magic, skip, u8};
use crate::{Error, Result};

pub const HEADER_SIZE: usize = 0x40;
pub const SAMPLE_RATE: u32 = 44100;

const GD3_OFFSET_BASE: u64 = 0x14;
const GD3_HEADER_SIZE: usize = 12;
/// Smallest GD3 block: eleven empty strings.
const GD3_MIN: u32 = 11 * 2;
pub const GD3_MAX: u32 = 128 * 1024;

const T6W28_BITS: u32 = 0xC000_0000;

/// GD3 tag indices.
const GD3_TRACK: usize = 0;
const GD3_GAME: usize = 2;
const GD3_SYSTEM: usize = 4;
const GD3_COMPOSER: usize = 6;
const GD3_DATE: usize = 8;
const GD3_RIPPER: usize = 9;
const GD3_NOTES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub sn76489_clk: u32,
    pub ym2413_clk: u32,
    pub gd3_offset: u32,
    pub sample_count: u32,
    pub loop_offset: u32,
    pub loop_samples: u32,
    pub frame_rate: u32,
    pub sn76489_lfsr: u16,
    pub sn76489_width: u8,
    pub ym2612_clk: u32,
    pub ym2151_clk: u32,
}

impl Header {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(buf);
        magic(&mut r, b"Vgm ")?;
        skip(&mut r, 4)?;
        let version = le_u32(&mut r)?;
        let sn76489_clk = le_u32(&mut r)?;
        let ym2413_clk = le_u32(&mut r)?;
        let gd3_offset = le_u32(&mut r)?;
        let sample_count = le_u32(&mut r)?;
        let loop_offset = le_u32(&mut r)?;
        let loop_samples = le_u32(&mut r)?;
        let frame_rate = le_u32(&mut r)?;
        let sn76489_lfsr = le_u16(&mut r)?;
        let sn76489_width = u8(&mut r)?;
        skip(&mut r, 1)?;
        let ym2612_clk = le_u32(&mut r)?;
        let ym2151_clk = le_u32(&mut r)?;

        // Fields newer than the file's version hold unrelated data.
        let v101 = version >= 0x0101;
        let v110 = version >= 0x0110;
        Ok(Self {
            version,
            sn76489_clk,
            ym2413_clk,
            gd3_offset,
            sample_count,
            loop_offset,
            loop_samples,
            frame_rate: if v101 { frame_rate } else { 0 },
            sn76489_lfsr: if v110 { sn76489_lfsr } else { 0 },
            sn76489_width: if v110 { sn76489_width } else { 0 },
            ym2612_clk: if v110 { ym2612_clk } else { 0 },
            ym2151_clk: if v110 { ym2151_clk } else { 0 },
        })
    }

    /// File offset of the GD3 block, if there is one.
    pub fn gd3_address(&self) -> Option<u64> {
        (self.gd3_offset != 0).then(|| self.gd3_offset as u64 + GD3_OFFSET_BASE)
    }
}

/// `"1:05.50"`: minutes, seconds, hundredths.
pub fn format_samples(samples: u32, rate: u32) -> String {
    let cs = (samples % rate) as u64 * 100 / rate as u64;
    let sec = samples / rate;
    format!("{}:{:02}.{:02}", sec / 60, sec % 60, cs)
}

pub fn samples_to_ms(samples: u32, rate: u32) -> i64 {
    (samples / rate) as i64 * 1000 + (samples % rate) as i64 * 1000 / rate as i64
}

/// Clock rate with three decimals in the largest fitting unit.
pub fn format_clock(hz: u32) -> String {
    match hz {
        0..1_000 => format!("{hz} Hz"),
        1_000..1_000_000 => format!("{}.{:03} kHz", hz / 1_000, hz % 1_000),
        1_000_000..1_000_000_000 => {
            format!("{}.{:03} MHz", hz / 1_000_000, (hz / 1_000) % 1_000)
        }
        _ => format!("{}.{:03} GHz", hz / 1_000_000_000, (hz / 1_000_000) % 1_000),
    }
}

/// Year from a GD3 release date such as `"1994"`, `"1994-03-01"` or `"1994/03"`.
fn release_year(date: &str) -> Option<u64> {
    let digits = date.bytes().take(4).take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    match date.as_bytes().get(digits) {
        None | Some(b'-' | b'/') => date[..digits].parse().ok(),
        Some(_) => None,
    }
}

/// Split NUL-terminated UTF-16LE strings.
fn split_gd3(data: &[u8]) -> Vec<String> {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let mut out = Vec::new();
    let mut parts = units.split(|&u| u == 0).collect::<Vec<_>>();
    // data ends with NUL, so the last part is always empty
    parts.pop();
    for p in parts {
        out.push(String::from_utf16_lossy(p));
    }
    out
}

#[derive(Debug)]
pub struct Vgm {
    pub header: Header,
    gd3: Option<Vec<String>>,
}

impl Vgm {
    fn read_gd3(&self, file: &SharedFile) -> Result<Vec<String>> {
        let Some(addr) = self.header.gd3_address() else {
            return Ok(Vec::new());
        };
        let hdr = file.read_exact_at(addr, GD3_HEADER_SIZE)?;
        let mut r = Cursor::new(&hdr[..]);
        magic(&mut r, b"Gd3 ")?;
        let version = le_u32(&mut r)?;
        if version < 0x0100 {
            return Err(Error::UnsupportedVersion(version));
        }
        let length = le_u32(&mut r)?;
        if length > GD3_MAX {
            return Err(Error::out_of_range("GD3 block", length as u64, GD3_MAX as u64));
        }
        if length % 2 != 0 || length < GD3_MIN {
            return Err(Error::Parse("bad GD3 length"));
        }
        let data = file.read_exact_at(addr + GD3_HEADER_SIZE as u64, length as usize)?;
        if data[data.len() - 2..] != [0, 0] {
            return Err(Error::Parse("GD3 block is not NUL-terminated"));
        }
        Ok(split_gd3(&data))
    }

    /// GD3 tags, read once.
    pub fn gd3(&mut self, file: &SharedFile) -> &[String] {
        if self.gd3.is_none() {
            let tags = self.read_gd3(file).unwrap_or_else(|e| {
                warn!("VGM: ignoring GD3 tags: {e}");
                Vec::new()
            });
            debug!(count = tags.len(), "GD3 tags");
            self.gd3 = Some(tags);
        }
        self.gd3.as_deref().unwrap_or_default()
    }
}

fn tag(tags: &[String], idx: usize) -> Option<&str> {
    tags.get(idx).map(String::as_str).filter(|s| !s.is_empty())
}

impl FormatParser for Vgm {
    const CLASS_NAME: &'static str = "VGM";
    const FILE_TYPE: FileType = FileType::AudioFile;
    const EXTENSIONS: &'static [&'static str] = &[".vgm"];
    const MIME_TYPES: &'static [&'static str] = &["audio/x-vgm"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        (info.header_addr == 0
            && info.header.len() >= HEADER_SIZE
            && info.header.starts_with(b"Vgm "))
        .then_some(0)
    }

    fn open(file: &SharedFile, _settings: &Settings) -> Result<Self> {
        let buf = file.read_exact_at(0, HEADER_SIZE)?;
        Ok(Self {
            header: Header::parse(&buf)?,
            gd3: None,
        })
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        pick_name(&["Video Game Music", "VGM", "VGM"], kind)
    }

    fn load_fields(
        &mut self,
        file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        let tr = |key: &str| settings.tr("VGM", key);
        let v = self.header.version;
        fields.add_string(tr("VGM Version"), format!("{:x}.{:02x}", v >> 8, v & 0xFF));

        let tags = self.gd3(file).to_vec();
        for (idx, key) in [
            (GD3_TRACK, "Track Name"),
            (GD3_GAME, "Game Name"),
            (GD3_SYSTEM, "System Name"),
            (GD3_COMPOSER, "Composer"),
            (GD3_DATE, "Release Date"),
            (GD3_RIPPER, "VGM Ripper"),
            (GD3_NOTES, "Notes"),
        ] {
            if let Some(s) = tag(&tags, idx) {
                fields.add_string(tr(key), s);
            }
        }

        let h = &self.header;
        fields.add_string(tr("Duration"), format_samples(h.sample_count, SAMPLE_RATE));
        if h.loop_offset != 0 {
            fields.add_string(tr("Loop Offset"), format_samples(h.loop_offset, SAMPLE_RATE));
        }
        if h.frame_rate != 0 {
            fields.add_string_numeric(tr("Frame Rate"), h.frame_rate, Base::Dec, 0, StringFlags::NONE);
        }

        let clock_name = |chip: &str| settings.tr("VGM", &format!("{chip} clock rate"));
        if h.sn76489_clk != 0 {
            let chip = if h.sn76489_clk & T6W28_BITS == T6W28_BITS {
                "T6W28"
            } else {
                "SN76489"
            };
            fields.add_string(clock_name(chip), format_clock(h.sn76489_clk & !T6W28_BITS));
            let lfsr = if h.sn76489_lfsr != 0 { h.sn76489_lfsr } else { 0x0009 };
            let width = if h.sn76489_width != 0 { h.sn76489_width } else { 16 };
            fields.add_string_numeric(
                settings.tr("VGM", &format!("{chip} LFSR pattern")),
                lfsr as u32,
                Base::Hex,
                4,
                StringFlags::MONOSPACE,
            );
            fields.add_string_numeric(
                settings.tr("VGM", &format!("{chip} LFSR width")),
                width as u32,
                Base::Dec,
                0,
                StringFlags::NONE,
            );
        }
        for (chip, clk) in [
            ("YM2413", h.ym2413_clk),
            ("YM2612", h.ym2612_clk),
            ("YM2151", h.ym2151_clk),
        ] {
            if clk != 0 {
                fields.add_string(clock_name(chip), format_clock(clk));
            }
        }
        Ok(())
    }

    fn load_metadata(
        &mut self,
        file: &SharedFile,
        _settings: &Settings,
        meta: &mut MetadataSet,
    ) -> Result<()> {
        meta.add_integer(
            Property::Duration,
            samples_to_ms(self.header.sample_count, SAMPLE_RATE),
        );
        let tags = self.gd3(file);
        if let Some(s) = tag(tags, GD3_TRACK) {
            meta.add_string(Property::Title, s);
        }
        if let Some(s) = tag(tags, GD3_GAME) {
            meta.add_string(Property::Album, s);
        }
        if let Some(s) = tag(tags, GD3_COMPOSER) {
            meta.add_string(Property::Composer, s);
        }
        if let Some(year) = tag(tags, GD3_DATE).and_then(release_year) {
            meta.add_unsigned(Property::ReleaseYear, year);
        }
        if let Some(s) = tag(tags, GD3_NOTES) {
            meta.add_string(Property::Comment, s);
        }
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

    fn gd3_block(tags: &[&str]) -> Vec<u8> {
        let mut data = Vec::new();
        for t in tags {
            for u in t.encode_utf16() {
                data.extend_from_slice(&u.to_le_bytes());
            }
            data.extend_from_slice(&[0, 0]);
        }
        let mut b = b"Gd3 ".to_vec();
        b.extend_from_slice(&0x0100u32.to_le_bytes());
        b.extend_from_slice(&(data.len() as u32).to_le_bytes());
        b.extend_from_slice(&data);
        b
    }

    /// Version 1.50 VGM with the given GD3 tags right after the header.
    pub(crate) fn vgm(tags: &[&str]) -> Vec<u8> {
        let mut b = vec![0u8; 0x100];
        b[..4].copy_from_slice(b"Vgm ");
        b[8..12].copy_from_slice(&0x0150u32.to_le_bytes());
        b[0x0C..0x10].copy_from_slice(&(0xC000_0000u32 | 3_579_545).to_le_bytes());
        b[0x18..0x1C].copy_from_slice(&(SAMPLE_RATE * 65 + SAMPLE_RATE / 2).to_le_bytes());
        b[0x2C..0x30].copy_from_slice(&7_670_453u32.to_le_bytes());
        if !tags.is_empty() {
            let off = b.len() as u32 - GD3_OFFSET_BASE as u32;
            b[0x14..0x18].copy_from_slice(&off.to_le_bytes());
            b.extend(gd3_block(tags));
        }
        b
    }

    const TAGS: [&str; 11] = [
        "Green Hill Zone", "", "Sonic", "", "Mega Drive", "", "Masato Nakamura", "", "1991/06/23",
        "ripper", "",
    ];

    fn open(data: Vec<u8>) -> RomData<Vgm> {
        RomData::new(SharedFile::new(MemFile::with_name(data, "a.vgm")), &Settings::default())
    }

    #[rstest]
    #[case(999, "999 Hz")]
    #[case(44_100, "44.100 kHz")]
    #[case(3_579_545, "3.579 MHz")]
    #[case(1_500_000_000, "1.500 GHz")]
    fn test_format_clock(#[case] hz: u32, #[case] expected: &str) {
        assert_eq!(format_clock(hz), expected);
    }

    #[rstest]
    #[case("1994", Some(1994))]
    #[case("1991/06/23", Some(1991))]
    #[case("1999-12", Some(1999))]
    #[case("94", Some(94))]
    #[case("June 1994", None)]
    #[case("19945", None)]
    fn test_release_year(#[case] date: &str, #[case] expected: Option<u64>) {
        assert_eq!(release_year(date), expected);
    }

    #[test]
    fn test_time_formats() {
        assert_eq!(format_samples(SAMPLE_RATE * 65 + SAMPLE_RATE / 2, SAMPLE_RATE), "1:05.50");
        assert_eq!(samples_to_ms(SAMPLE_RATE * 2 + SAMPLE_RATE / 4, SAMPLE_RATE), 2250);
    }

    #[test]
    fn test_fields() {
        let mut rd = open(vgm(&TAGS));
        let f = rd.fields().unwrap();
        assert_eq!(f.string("VGM Version"), Some("1.50"));
        assert_eq!(f.string("Track Name"), Some("Green Hill Zone"));
        assert_eq!(f.string("Game Name"), Some("Sonic"));
        assert!(f.string("Notes").is_none());
        assert_eq!(f.string("Duration"), Some("1:05.50"));
        assert_eq!(f.string("T6W28 clock rate"), Some("3.579 MHz"));
        assert_eq!(f.string("T6W28 LFSR pattern"), Some("0x0009"));
        assert_eq!(f.string("T6W28 LFSR width"), Some("16"));
        assert_eq!(f.string("YM2612 clock rate"), Some("7.670 MHz"));
        assert!(f.string("YM2413 clock rate").is_none());
    }

    #[test]
    fn test_metadata() {
        let mut rd = open(vgm(&TAGS));
        let m = rd.metadata().unwrap();
        assert_eq!(m.string(Property::Title), Some("Green Hill Zone"));
        assert_eq!(m.string(Property::Album), Some("Sonic"));
        assert_eq!(m.string(Property::Composer), Some("Masato Nakamura"));
        assert_eq!(
            m.get(Property::Duration),
            Some(&crate::metadata::MetaValue::Integer(65_500))
        );
    }

    #[test]
    fn test_bad_gd3_is_ignored() {
        let mut data = vgm(&TAGS);
        // drop the terminating NUL of the last string
        let n = data.len();
        data[n - 2] = b'x';
        let mut rd = open(data);
        let f = rd.fields().unwrap();
        assert!(f.string("Track Name").is_none());
        assert!(f.string("Duration").is_some());
    }

    #[test]
    fn test_gd3_ceiling() {
        let mut data = vgm(&TAGS);
        let at = 0x100 + 8;
        data[at..at + 4].copy_from_slice(&(GD3_MAX + 2).to_le_bytes());
        let vgm = Vgm::open(&SharedFile::new(MemFile::new(data.clone())), &Settings::default())
            .unwrap();
        let err = vgm.read_gd3(&SharedFile::new(MemFile::new(data))).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
    }

    #[test]
    fn test_old_version_ignores_newer_fields() {
        let mut data = vgm(&[]);
        data[8..12].copy_from_slice(&0x0100u32.to_le_bytes());
        let h = Header::parse(&data).unwrap();
        assert_eq!(h.ym2612_clk, 0);
        assert_eq!(h.gd3_address(), None);
    }
}
