//! Sega Dreamcast VMU saves: `.vms` data files and their `.vmi` index.
//!
//! A `.vms` holds the raw VMU file. Data files carry the header at 0,
//! game files at 0x200. The VMU BIOS icon file (`ICONDATA_VMS`) uses its
//! own smaller header instead.
//!
//! ## VMS header (0x80 bytes, little-endian)
//! ```text
//! [0x00] VMS description  (16 bytes, Shift-JIS, shown on the VMU)
//! [0x10] DC description   (32 bytes, Shift-JIS, shown in the file manager)
//! [0x30] Application      (16 bytes)
//! [0x40] Icon count       (u16, 1..=3)
//! [0x42] Animation speed  (u16, 1/30 s per frame)
//! [0x44] Eyecatch type    (u16, 0..=3)
//! [0x46] CRC              (u16)
//! [0x48] Data size        (u32)
//! [0x4C] Reserved
//! [0x60] Icon palette     (16 x ARGB4444)
//! [0x80] Icon frames      (32x32 CI4, 0x200 bytes each)
//! [....] Eyecatch         (72x56, see below)
//! ```
//!
//! | Eyecatch type | Data |
//! |---------------|------|
//! | 0 | none |
//! | 1 | ARGB4444, 8064 bytes |
//! | 2 | 256 x ARGB4444 palette, then CI8, 4544 bytes |
//! | 3 | 16 x ARGB4444 palette, then CI4, 2048 bytes |
//!
//! ## ICONDATA_VMS
//! ```text
//! [0x00] Description      (16 bytes, Shift-JIS)
//! [0x10] Mono icon offset (u32, 32x32 1bpp)
//! [0x14] Color icon offset(u32, 0 if absent; 16 x ARGB4444 palette, then 32x32 CI4)
//! ```
//!
//! ## VMI (0x6C bytes)
//! ```text
//! [0x00] Checksum         (resource name[0..4] AND "SEGA")
//! [0x04] Description      (32 bytes, Shift-JIS)
//! [0x24] Copyright        (32 bytes, Shift-JIS)
//! [0x44] Creation time    (year u16, month, day, hour, minute, second, weekday)
//! [0x4C] VMI version      (u16)
//! [0x4E] File number      (u16)
//! [0x50] Resource name    (8 bytes, base name of the .vms)
//! [0x58] VMS filename     (12 bytes, name on the VMU)
//! [0x64] Mode             (u16; bit 1 = game, bit 0 = copy protected)
//! [0x66] Reserved
//! [0x68] VMS file size    (u32)
//! ```

use std::io::Cursor;
use std::rc::Rc;

use time::error::ComponentRange;
use time::{Date, Month, PrimitiveDateTime, Time};
use tracing::debug;

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::fields::{Base, DateTimeFlags, FieldTable, StringFlags};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatHandler, FormatParser, RomData, SystemNameKind, pick_name};
use crate::image::{
    Bitmap, IconAnim, ImageProcessing, ImageSizeDef, ImageType, ImageTypes, decode_argb4444,
    decode_ci4_argb4444, decode_ci8_argb4444, decode_mono,
};
use crate::text::{latin1, shift_jis, trim_padding};
use crate::utils::{bytesa, le_u16, le_u32, slice, u8};
use crate::{Error, Result};

pub const VMS_BLOCK_SIZE: u64 = 512;
/// Monochrome-only ICONDATA_VMS.
pub const VMS_ICONDATA_MONO_SIZE: u64 = 160;
pub const VMS_HEADER_SIZE: usize = 0x80;
pub const ICONDATA_HEADER_SIZE: usize = 0x18;
pub const VMI_SIZE: u64 = 0x6C;
/// Header offset in game files.
const GAME_HEADER_ADDR: u64 = 0x200;

const ICON_W: u32 = 32;
const ICON_H: u32 = 32;
const ICON_FRAME_SIZE: usize = (ICON_W * ICON_H / 2) as usize;
const ICON_MONO_SIZE: usize = (ICON_W * ICON_H / 8) as usize;
const ICON_PALETTE_SIZE: usize = 16 * 2;

const EYECATCH_W: u32 = 72;
const EYECATCH_H: u32 = 56;
const EYECATCH_NONE: u16 = 0;
const EYECATCH_ARGB4444: u16 = 1;
const EYECATCH_CI8: u16 = 2;
const EYECATCH_CI4: u16 = 3;

/// Animation speed units per second.
const ANIM_TICKS_PER_SEC: u32 = 30;

const MODE_GAME: u16 = 1 << 1;
const MODE_COPY_PROTECT: u16 = 1 << 0;

const MONO_ON: u32 = 0xFF00_0000;
const MONO_OFF: u32 = 0xFFFF_FFFF;

fn padded(field: &[u8]) -> String {
    trim_padding(&shift_jis(field)).to_string()
}

/// Size rule for a `.vms`.
fn is_vms_size(size: u64) -> bool {
    size % VMS_BLOCK_SIZE == 0 || size == VMS_ICONDATA_MONO_SIZE
}

fn read_palette<const N: usize>(data: &[u8]) -> Result<[u16; N]> {
    let data = slice(data, 0, N * 2)?;
    let mut pal = [0u16; N];
    for (p, c) in pal.iter_mut().zip(data.chunks_exact(2)) {
        *p = u16::from_le_bytes([c[0], c[1]]);
    }
    Ok(pal)
}

/// Creation time as seconds since the epoch, taken as UTC.
fn vmi_timestamp(
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> std::result::Result<i64, ComponentRange> {
    let date = Date::from_calendar_date(i32::from(year), Month::try_from(month)?, day)?;
    let time = Time::from_hms(hour, minute, second)?;
    Ok(PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmsHeader {
    pub vms_description: String,
    pub dc_description: String,
    pub application: String,
    pub icon_count: u16,
    pub anim_speed: u16,
    pub eyecatch_type: u16,
    pub crc: u16,
    pub data_size: u32,
    pub palette: [u16; 16],
}

impl VmsHeader {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(buf);
        let vms_description: [u8; 16] = bytesa(&mut r)?;
        let dc_description: [u8; 32] = bytesa(&mut r)?;
        let application: [u8; 16] = bytesa(&mut r)?;
        let icon_count = le_u16(&mut r)?;
        let anim_speed = le_u16(&mut r)?;
        let eyecatch_type = le_u16(&mut r)?;
        let crc = le_u16(&mut r)?;
        let data_size = le_u32(&mut r)?;
        r.set_position(0x60);
        let mut palette = [0u16; 16];
        for p in &mut palette {
            *p = le_u16(&mut r)?;
        }
        if !(1..=3).contains(&icon_count) || eyecatch_type > EYECATCH_CI4 {
            return Err(Error::BadMagic);
        }
        Ok(Self {
            vms_description: padded(&vms_description),
            dc_description: padded(&dc_description),
            application: padded(&application),
            icon_count,
            anim_speed,
            eyecatch_type,
            crc,
            data_size,
            palette,
        })
    }

    /// Bytes of eyecatch data after the icon frames.
    pub fn eyecatch_size(&self) -> usize {
        let px = (EYECATCH_W * EYECATCH_H) as usize;
        match self.eyecatch_type {
            EYECATCH_ARGB4444 => px * 2,
            EYECATCH_CI8 => 256 * 2 + px,
            EYECATCH_CI4 => ICON_PALETTE_SIZE + px / 2,
            _ => 0,
        }
    }
}

/// Header of the VMU BIOS icon file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconData {
    pub description: String,
    pub mono_icon_addr: u32,
    /// Zero when there is no color icon.
    pub color_icon_addr: u32,
}

impl IconData {
    /// Parse and check that both icons fit in a file of `file_size` bytes.
    pub fn parse(buf: &[u8], file_size: u64) -> Result<Self> {
        let mut r = Cursor::new(buf);
        let description: [u8; 16] = bytesa(&mut r)?;
        let mono_icon_addr = le_u32(&mut r)?;
        let color_icon_addr = le_u32(&mut r)?;

        let fits = |addr: u32, len: usize| {
            addr as usize >= ICONDATA_HEADER_SIZE && addr as u64 + len as u64 <= file_size
        };
        if !fits(mono_icon_addr, ICON_MONO_SIZE) {
            return Err(Error::BadMagic);
        }
        if color_icon_addr != 0 && !fits(color_icon_addr, ICON_PALETTE_SIZE + ICON_FRAME_SIZE) {
            return Err(Error::BadMagic);
        }
        Ok(Self {
            description: padded(&description),
            mono_icon_addr,
            color_icon_addr,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vmi {
    pub description: String,
    pub copyright: String,
    /// Seconds since the epoch, local wall clock stored as UTC.
    pub ctime: std::result::Result<i64, ComponentRange>,
    pub version: u16,
    pub file_number: u16,
    pub resource_name: String,
    pub vms_filename: String,
    pub mode: u16,
    pub vms_size: u32,
}

impl Vmi {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let mut r = Cursor::new(buf);
        let checksum: [u8; 4] = bytesa(&mut r)?;
        let description: [u8; 32] = bytesa(&mut r)?;
        let copyright: [u8; 32] = bytesa(&mut r)?;
        let year = le_u16(&mut r)?;
        let month = u8(&mut r)?;
        let day = u8(&mut r)?;
        let hour = u8(&mut r)?;
        let minute = u8(&mut r)?;
        let second = u8(&mut r)?;
        let _weekday = u8(&mut r)?;
        let version = le_u16(&mut r)?;
        let file_number = le_u16(&mut r)?;
        let resource_name: [u8; 8] = bytesa(&mut r)?;
        let vms_filename: [u8; 12] = bytesa(&mut r)?;
        let mode = le_u16(&mut r)?;
        let _reserved = le_u16(&mut r)?;
        let vms_size = le_u32(&mut r)?;

        let expected: Vec<u8> = resource_name[..4]
            .iter()
            .zip(b"SEGA")
            .map(|(a, b)| a & b)
            .collect();
        if checksum[..] != expected[..] {
            return Err(Error::BadMagic);
        }

        Ok(Self {
            description: padded(&description),
            copyright: padded(&copyright),
            ctime: vmi_timestamp(year, month, day, hour, minute, second),
            version,
            file_number,
            resource_name: trim_padding(&latin1(&resource_name)).to_string(),
            vms_filename: trim_padding(&latin1(&vms_filename)).to_string(),
            mode,
            vms_size,
        })
    }

    pub fn is_game(&self) -> bool {
        self.mode & MODE_GAME != 0
    }
}

/// Which file a handler was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SaveType {
    Vms = 0,
    Vmi = 1,
    IconData = 2,
}

#[derive(Debug)]
pub struct DreamcastSave {
    pub vms: Option<VmsHeader>,
    /// Offset of the VMS header in the `.vms`.
    vms_addr: u64,
    pub vmi: Option<Vmi>,
    pub icondata: Option<IconData>,
}

impl DreamcastSave {
    /// Find the VMS header: at the offset the VMI asks for, or at 0 then
    /// 0x200 without one.
    fn read_vms(vms: &SharedFile, vmi: Option<&Vmi>) -> Result<(VmsHeader, u64)> {
        let addrs: &[u64] = match vmi {
            Some(v) if v.is_game() => &[GAME_HEADER_ADDR],
            Some(_) => &[0],
            None => &[0, GAME_HEADER_ADDR],
        };
        let mut last = Error::BadMagic;
        for &addr in addrs {
            match vms
                .read_exact_at(addr, VMS_HEADER_SIZE)
                .and_then(|buf| VmsHeader::parse(&buf))
            {
                Ok(h) => return Ok((h, addr)),
                Err(e) => last = e,
            }
        }
        Err(last)
    }

    fn read_vmi(vmi: &SharedFile) -> Result<Vmi> {
        Vmi::parse(&vmi.read_exact_at(0, VMI_SIZE as usize)?)
    }

    /// Build from both halves of a pair.
    pub fn from_pair(vms: &SharedFile, vmi: &SharedFile) -> Result<Self> {
        let vmi = Self::read_vmi(vmi)?;
        let (header, vms_addr) = Self::read_vms(vms, Some(&vmi))?;
        Ok(Self {
            vms: Some(header),
            vms_addr,
            vmi: Some(vmi),
            icondata: None,
        })
    }

    pub fn is_game(&self) -> bool {
        match &self.vmi {
            Some(v) => v.is_game(),
            None => self.vms_addr == GAME_HEADER_ADDR,
        }
    }

    /// Read `len` bytes, or `None` if the file ends first.
    fn read_opt(file: &SharedFile, addr: u64, len: usize) -> Result<Option<Vec<u8>>> {
        match file.read_exact_at(addr, len) {
            Ok(d) => Ok(Some(d)),
            Err(Error::Truncated) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn icondata_icon(file: &SharedFile, d: &IconData) -> Result<Option<Bitmap>> {
        if d.color_icon_addr != 0 {
            let Some(data) =
                Self::read_opt(file, d.color_icon_addr as u64, ICON_PALETTE_SIZE + ICON_FRAME_SIZE)?
            else {
                return Ok(None);
            };
            let palette: [u16; 16] = read_palette(&data)?;
            return decode_ci4_argb4444(ICON_W, ICON_H, &data[ICON_PALETTE_SIZE..], &palette)
                .map(Some);
        }
        let Some(data) = Self::read_opt(file, d.mono_icon_addr as u64, ICON_MONO_SIZE)? else {
            return Ok(None);
        };
        decode_mono(ICON_W, ICON_H, &data, MONO_ON, MONO_OFF).map(Some)
    }

    /// All icon frames of the VMS, in order.
    fn vms_icons(&self, file: &SharedFile) -> Result<Option<Vec<Bitmap>>> {
        let Some(h) = &self.vms else {
            return Ok(None);
        };
        let count = h.icon_count as usize;
        let addr = self.vms_addr + VMS_HEADER_SIZE as u64;
        let Some(data) = Self::read_opt(file, addr, ICON_FRAME_SIZE * count)? else {
            return Ok(None);
        };
        data.chunks_exact(ICON_FRAME_SIZE)
            .map(|frame| decode_ci4_argb4444(ICON_W, ICON_H, frame, &h.palette))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn eyecatch(&self, file: &SharedFile) -> Result<Option<Bitmap>> {
        let Some(h) = &self.vms else {
            return Ok(None);
        };
        if h.eyecatch_type == EYECATCH_NONE {
            return Ok(None);
        }
        let addr = self.vms_addr
            + VMS_HEADER_SIZE as u64
            + ICON_FRAME_SIZE as u64 * h.icon_count as u64;
        let Some(data) = Self::read_opt(file, addr, h.eyecatch_size())? else {
            return Ok(None);
        };
        let img = match h.eyecatch_type {
            EYECATCH_ARGB4444 => decode_argb4444(EYECATCH_W, EYECATCH_H, &data)?,
            EYECATCH_CI8 => {
                let palette: [u16; 256] = read_palette(&data)?;
                decode_ci8_argb4444(EYECATCH_W, EYECATCH_H, &data[256 * 2..], &palette)?
            }
            _ => {
                let palette: [u16; 16] = read_palette(&data)?;
                decode_ci4_argb4444(EYECATCH_W, EYECATCH_H, &data[ICON_PALETTE_SIZE..], &palette)?
            }
        };
        Ok(Some(img))
    }
}

/// Open `file` together with its `.vms`/`.vmi` sibling.
///
/// The sibling's extension follows the case of `file`'s. Returns `None`
/// when `file` is not one half of a pair, the sibling cannot be opened,
/// or the pair does not validate. The handler keeps the `.vms`.
pub fn open_pair(file: &SharedFile, settings: &Settings) -> Option<Box<dyn FormatHandler>> {
    let ext = file.extension()?;
    if !ext.eq_ignore_ascii_case(".vms") && !ext.eq_ignore_ascii_case(".vmi") {
        return None;
    }
    let size = file.size();
    let has_vms = is_vms_size(size);
    let has_vmi = size == VMI_SIZE;
    if has_vms == has_vmi {
        return None;
    }

    let upper = ext[1..].chars().all(|c| c.is_ascii_uppercase());
    let other_ext = match (has_vms, upper) {
        (true, true) => ".VMI",
        (true, false) => ".vmi",
        (false, true) => ".VMS",
        (false, false) => ".vms",
    };
    let Some(other) = file.open_related(other_ext) else {
        debug!("no {other_ext} sibling");
        return None;
    };
    let (vms, vmi) = if has_vms {
        (file.clone(), other)
    } else {
        (other, file.clone())
    };

    match DreamcastSave::from_pair(&vms, &vmi) {
        Ok(parser) => Some(Box::new(RomData::from_parser(vms, settings, parser))),
        Err(e) => {
            debug!("pair rejected: {e}");
            None
        }
    }
}

impl FormatParser for DreamcastSave {
    const CLASS_NAME: &'static str = "DreamcastSave";
    const FILE_TYPE: FileType = FileType::SaveFile;
    const EXTENSIONS: &'static [&'static str] = &[".vms", ".vmi"];
    const MIME_TYPES: &'static [&'static str] =
        &["application/x-dreamcast-vms", "application/x-dreamcast-vmi"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        if info.header_addr != 0 {
            return None;
        }
        if info.ext_is(&[".vmi"]) && info.file_size == VMI_SIZE {
            return Vmi::parse(info.header).ok().map(|_| SaveType::Vmi as u32);
        }
        if info.ext_is(&[".vms"]) && is_vms_size(info.file_size) {
            let found = [0, GAME_HEADER_ADDR].iter().any(|&addr| {
                slice(info.header, addr as usize, VMS_HEADER_SIZE)
                    .and_then(VmsHeader::parse)
                    .is_ok()
            });
            if found {
                return Some(SaveType::Vms as u32);
            }
            return IconData::parse(info.header, info.file_size)
                .ok()
                .map(|_| SaveType::IconData as u32);
        }
        None
    }

    fn open(file: &SharedFile, _settings: &Settings) -> Result<Self> {
        let head = file.read_upto(0, GAME_HEADER_ADDR as usize + VMS_HEADER_SIZE)?;
        let ext = file.extension();
        let info = DetectInfo::new(&head, 0, file.size(), ext.as_deref());
        let mut save = Self {
            vms: None,
            vms_addr: 0,
            vmi: None,
            icondata: None,
        };
        match Self::is_supported(&info) {
            Some(t) if t == SaveType::Vmi as u32 => save.vmi = Some(Self::read_vmi(file)?),
            Some(t) if t == SaveType::IconData as u32 => {
                save.icondata = Some(IconData::parse(&head, file.size())?);
            }
            Some(_) => {
                let (header, vms_addr) = Self::read_vms(file, None)?;
                save.vms = Some(header);
                save.vms_addr = vms_addr;
            }
            None => return Err(Error::UnsupportedFormat),
        }
        Ok(save)
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        pick_name(&["Sega Dreamcast", "Dreamcast", "DC"], kind)
    }

    fn image_types() -> ImageTypes {
        ImageTypes::of(ImageType::IntIcon) | ImageType::IntBanner
    }

    fn image_sizes(t: ImageType) -> Vec<ImageSizeDef> {
        match t {
            ImageType::IntBanner => vec![ImageSizeDef::new(EYECATCH_W as u16, EYECATCH_H as u16)],
            _ => vec![ImageSizeDef::new(ICON_W as u16, ICON_H as u16)],
        }
    }

    fn image_processing(t: ImageType) -> ImageProcessing {
        match t {
            ImageType::IntIcon => ImageProcessing::NEAREST_NEIGHBOR,
            _ => ImageProcessing::NONE,
        }
    }

    fn load_fields(
        &mut self,
        _file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        let tr = |key: &str| settings.tr("DreamcastSave", key);

        if let Some(d) = &self.icondata {
            fields.add_tab("ICONDATA");
            fields.add_string(tr("File Type"), tr("Icon Data"));
            fields.add_string(tr("VMS Description"), d.description.as_str());
            fields.add_string(
                tr("Color Icon"),
                if d.color_icon_addr != 0 { tr("Yes") } else { tr("No") },
            );
            return Ok(());
        }

        fields.add_tab(if self.vms.is_some() { "VMS" } else { "VMI" });
        fields.add_string(
            tr("File Type"),
            if self.is_game() { tr("Game") } else { tr("Data") },
        );
        if let Some(h) = &self.vms {
            fields.add_string(tr("VMS Description"), h.vms_description.as_str());
            fields.add_string(tr("DC Description"), h.dc_description.as_str());
            fields.add_string(tr("Application"), h.application.as_str());
            fields.add_string_numeric(
                tr("Icon Count"),
                h.icon_count as u32,
                Base::Dec,
                0,
                StringFlags::NONE,
            );
            let eyecatch = ["None", "ARGB4444", "CI8", "CI4"]
                .get(h.eyecatch_type as usize)
                .copied()
                .unwrap_or("None");
            fields.add_string(tr("Eyecatch"), tr(eyecatch));
        }
        if let Some(v) = &self.vmi {
            if self.vms.is_some() {
                fields.add_tab("VMI");
            }
            if let Err(e) = &v.ctime {
                debug!("VMI creation time: {e}");
            }
            fields.add_datetime(
                tr("Creation Time"),
                v.ctime.ok(),
                DateTimeFlags::HAS_DATE | DateTimeFlags::HAS_TIME,
            );
            fields.add_string(tr("VMI Description"), v.description.as_str());
            fields.add_string(tr("VMI Copyright"), v.copyright.as_str());
            fields.add_string_flags(tr("VMS Filename"), v.vms_filename.as_str(), StringFlags::MONOSPACE);
            fields.add_bitfield(
                tr("Mode"),
                [tr("Copy Protected"), tr("Game")],
                0,
                (v.mode & (MODE_COPY_PROTECT | MODE_GAME)) as u32,
            );
        }
        Ok(())
    }

    fn load_image(&mut self, file: &SharedFile, t: ImageType) -> Result<Option<Rc<Bitmap>>> {
        let img = match t {
            ImageType::IntIcon => match &self.icondata {
                Some(d) => Self::icondata_icon(file, d)?,
                None => self
                    .vms_icons(file)?
                    .and_then(|frames| frames.into_iter().next()),
            },
            ImageType::IntBanner => self.eyecatch(file)?,
            _ => return Err(Error::NotApplicable),
        };
        Ok(img.map(Rc::new))
    }

    fn load_icon_anim(&mut self, file: &SharedFile) -> Result<Option<IconAnim>> {
        let Some(h) = &self.vms else {
            return Ok(None);
        };
        if h.icon_count < 2 || h.anim_speed == 0 {
            return Ok(None);
        }
        let delay = h.anim_speed as u32 * 1000 / ANIM_TICKS_PER_SEC;
        let Some(frames) = self.vms_icons(file)? else {
            return Ok(None);
        };
        Ok(Some(IconAnim {
            delays_ms: vec![delay; frames.len()],
            frames: frames.into_iter().map(Rc::new).collect(),
        }))
    }
}
