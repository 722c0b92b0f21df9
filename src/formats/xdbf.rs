//! XDBF - Xbox 360 resource container (`.xdbf`, `.spa`).
//!
//! Holds a title's localized strings, achievement and avatar award tables,
//! and PNG images. Everything is big-endian.
//!
//! ## Layout
//! ```text
//! [0x00] Header             (0x18 bytes)
//! [0x18] Entry table        (EntryTableLength × 0x12)
//! [...]  Free space table   (FreeSpaceTableLength × 0x08)
//! [...]  Data               (entry offsets are relative to here)
//! ```
//!
//! ## Header (0x18 bytes)
//! ```text
//! [0x00] Magic "XDBF"
//! [0x04] Version (0x00010000)
//! [0x08] EntryTableLength   (entries)
//! [0x0C] EntryCount         (used entries)
//! [0x10] FreeSpaceTableLength
//! [0x14] FreeSpaceTableCount
//! ```
//!
//! ## Entry (0x12 bytes)
//! ```text
//! [0x00] NamespaceId  (u16)   1 = metadata, 2 = image, 3 = string table
//! [0x02] ResourceId   (u64)   metadata: magic as u64; string table: language id
//! [0x0A] Offset       (u32)
//! [0x0E] Length       (u32)
//! ```
//!
//! ## Metadata resources
//! ```text
//! XSTC (0x10)  magic, version 1, size 0x0C, default language (u32)
//! XSTR (0x0E+) magic, version 1, size, count (u16), then {id u16, len u16, UTF-8}
//! XTHD (0x2C)  magic, version, size, title id, title type, version (4 × u16), reserved
//! XACH (0x0E+) magic, version 1, size, count (u16), then 0x24-byte entries
//! XGAA (0x0E+) magic, version 1, size, count (u16), then 0x24-byte entries
//! ```

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::{trace, warn};

use crate::config::{
    LC_DE, LC_EN, LC_ES, LC_FR, LC_HANS, LC_IT, LC_JA, LC_KO, LC_PL, LC_PT, LC_RU, LC_ZH, Settings,
};
use crate::detector::DetectInfo;
use crate::fields::{Base, FieldTable, ListData, ListFlags, ListRows, StringFlags};
use crate::file::SharedFile;
use crate::handler::{FileType, FormatParser, SystemNameKind, pick_name};
use crate::image::{
    Bitmap, ImageProcessing, ImageSizeDef, ImageType, ImageTypes, decode_png,
};
use crate::metadata::{MetadataSet, Property};
use crate::text::dos2unix;
use crate::utils::{be_u16, be_u32, be_u32_at, cursor_at, slice};
use crate::{Error, Result};

pub const HEADER_SIZE: usize = 0x18;
pub const ENTRY_SIZE: usize = 0x12;
const FREE_SPACE_ENTRY_SIZE: u64 = 8;
const VERSION: u32 = 0x10000;
/// Entry tables this long or longer are rejected.
pub const MAX_ENTRIES: u32 = 1 << 20;

pub const NS_METADATA: u16 = 1;
pub const NS_IMAGE: u16 = 2;
pub const NS_STRING_TABLE: u16 = 3;

/// Resource id of the title string and the title icon.
pub const ID_TITLE: u64 = 0x8000;

const fn res_id(m: &[u8; 4]) -> u64 {
    u32::from_be_bytes(*m) as u64
}

pub const XSTC: u64 = res_id(b"XSTC");
pub const XTHD: u64 = res_id(b"XTHD");
pub const XACH: u64 = res_id(b"XACH");
pub const XGAA: u64 = res_id(b"XGAA");

const XSTC_SIZE: usize = 0x10;
const XSTR_HEADER_SIZE: usize = 0x0E;
const XTHD_SIZE: usize = 0x2C;
const LIST_HEADER_SIZE: usize = 0x0E;
const LIST_ENTRY_SIZE: usize = 0x24;
const XACH_MAX_COUNT: usize = 512;
const XGAA_MAX_COUNT: usize = 16;

/// Largest string table accepted.
pub const MAX_STRING_TABLE: u32 = 1024 * 1024;
/// Smallest and largest image resource accepted.
pub const MIN_IMAGE: u32 = 16;
pub const MAX_IMAGE: u32 = 1024 * 1024;

pub const LANG_ENGLISH: u8 = 1;
/// One past the highest language id.
pub const LANG_MAX: usize = 13;

const LANG_CODES: [u32; LANG_MAX] = [
    0, LC_EN, LC_JA, LC_DE, LC_FR, LC_ES, LC_IT, LC_KO, LC_ZH, LC_PT, LC_HANS, LC_PL, LC_RU,
];

/// Language code of an XDBF language id.
pub fn language_code(id: u8) -> Option<u32> {
    LANG_CODES.get(id as usize).copied().filter(|&lc| lc != 0)
}

/// XDBF language id of a language code.
pub fn language_id(lc: u32) -> Option<u8> {
    if lc == 0 {
        return None;
    }
    LANG_CODES.iter().position(|&c| c == lc).map(|i| i as u8)
}

const TITLE_TYPES: [&str; 4] = ["System Title", "Full Game", "Demo", "Download"];

const CTX: &str = "Xbox360_XDBF";

/// Decoded file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub entry_table_length: u32,
    pub entry_count: u32,
    pub free_space_table_length: u32,
    pub free_space_table_count: u32,
}

impl Header {
    fn parse(buf: &[u8]) -> Result<Self> {
        let mut r = cursor_at(buf, 4);
        Ok(Self {
            version: be_u32(&mut r)?,
            entry_table_length: be_u32(&mut r)?,
            entry_count: be_u32(&mut r)?,
            free_space_table_length: be_u32(&mut r)?,
            free_space_table_count: be_u32(&mut r)?,
        })
    }
}

/// One entry-table record.
///
/// The composite key is kept as it appears in the file; lookups encode the
/// query the same way instead of decoding every entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    key: [u8; 10],
    pub offset: u32,
    pub length: u32,
}

impl Entry {
    fn parse(raw: &[u8]) -> Result<Self> {
        let key: [u8; 10] = slice(raw, 0, 10)?
            .try_into()
            .map_err(|_| Error::Truncated)?;
        let mut r = cursor_at(raw, 10);
        Ok(Self {
            key,
            offset: be_u32(&mut r)?,
            length: be_u32(&mut r)?,
        })
    }

    pub fn namespace(&self) -> u16 {
        u16::from_be_bytes([self.key[0], self.key[1]])
    }

    pub fn resource_id(&self) -> u64 {
        let mut id = [0u8; 8];
        id.copy_from_slice(&self.key[2..]);
        u64::from_be_bytes(id)
    }
}

fn composite_key(namespace: u16, resource_id: u64) -> [u8; 10] {
    let mut key = [0u8; 10];
    key[..2].copy_from_slice(&namespace.to_be_bytes());
    key[2..].copy_from_slice(&resource_id.to_be_bytes());
    key
}

/// A row source shared by achievements and avatar awards.
struct Award {
    id: String,
    name_id: u16,
    unlocked_desc_id: u16,
    locked_desc_id: u16,
    image_id: u32,
    gamerscore: Option<u16>,
}

/// Open XDBF container.
#[derive(Debug)]
pub struct Xdbf {
    pub header: Header,
    entries: Vec<Entry>,
    data_offset: u64,
    /// Preferred language from [`Settings`].
    system_lang: u32,
    /// Index into `entries` of each language's string table.
    lang_index: [Option<usize>; LANG_MAX],
    string_tables: [Option<Vec<u8>>; LANG_MAX],
    images: HashMap<u64, Rc<Bitmap>>,
    lang_id: Option<u8>,
}

impl Xdbf {
    /// Read the header and entry table.
    pub fn parse(file: &SharedFile, settings: &Settings) -> Result<Self> {
        let buf = file.read_exact_at(0, HEADER_SIZE)?;
        let info = DetectInfo::new(&buf, 0, file.size(), None);
        if Self::is_supported(&info).is_none() {
            return Err(Error::BadMagic);
        }
        let header = Header::parse(&buf)?;
        if header.entry_table_length >= MAX_ENTRIES {
            return Err(Error::out_of_range(
                "entry table",
                header.entry_table_length as u64,
                MAX_ENTRIES as u64 - 1,
            ));
        }

        let etl = header.entry_table_length as usize;
        let table = file.read_exact_at(HEADER_SIZE as u64, etl * ENTRY_SIZE)?;
        let entries = table
            .chunks_exact(ENTRY_SIZE)
            .map(Entry::parse)
            .collect::<Result<Vec<_>>>()?;

        let data_offset = HEADER_SIZE as u64
            + etl as u64 * ENTRY_SIZE as u64
            + header.free_space_table_length as u64 * FREE_SPACE_ENTRY_SIZE;

        let mut xdbf = Self {
            header,
            entries,
            data_offset,
            system_lang: settings.language,
            lang_index: [None; LANG_MAX],
            string_tables: Default::default(),
            images: HashMap::new(),
            lang_id: None,
        };
        xdbf.init_language_index();
        Ok(xdbf)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// File offset where entry data starts.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// First entry with this namespace and resource id.
    pub fn find_resource(&self, namespace: u16, resource_id: u64) -> Option<&Entry> {
        let key = composite_key(namespace, resource_id);
        self.entries.iter().find(|e| e.key == key)
    }

    /// Record the first string table of every language.
    fn init_language_index(&mut self) {
        self.lang_index = [None; LANG_MAX];
        for (idx, e) in self.entries.iter().enumerate() {
            if e.namespace() != NS_STRING_TABLE {
                continue;
            }
            let lang = e.resource_id();
            if lang == 0 || lang >= LANG_MAX as u64 {
                continue;
            }
            let slot = &mut self.lang_index[lang as usize];
            if slot.is_none() {
                *slot = Some(idx);
            }
        }
    }

    /// True if a string table exists for `lang`.
    pub fn has_language(&self, lang: u8) -> bool {
        self.lang_index
            .get(lang as usize)
            .is_some_and(Option::is_some)
    }

    /// Languages with a string table, ascending.
    pub fn languages(&self) -> impl Iterator<Item = u8> + '_ {
        (1..LANG_MAX as u8).filter(|&l| self.has_language(l))
    }

    /// Read a resource's bytes after checking its declared length.
    fn read_resource(&self, file: &SharedFile, e: &Entry, min: u32, max: u32, what: &'static str) -> Result<Vec<u8>> {
        if e.length < min || e.length > max {
            return Err(Error::out_of_range(what, e.length as u64, max as u64));
        }
        file.read_exact_at(self.data_offset + e.offset as u64, e.length as usize)
    }

    /// Load and cache the string table for `lang`.
    pub fn load_string_table(&mut self, file: &SharedFile, lang: u8) -> Result<&[u8]> {
        let slot = lang as usize;
        if lang == 0 || slot >= LANG_MAX {
            return Err(Error::Parse("language id out of range"));
        }
        if self.string_tables[slot].is_none() {
            let idx = self.lang_index[slot].ok_or(Error::Parse("no string table for language"))?;
            let e = &self.entries[idx];
            if e.length as usize <= XSTR_HEADER_SIZE {
                return Err(Error::Truncated);
            }
            let buf = self.read_resource(file, e, 0, MAX_STRING_TABLE, "string table")?;
            if !buf.starts_with(b"XSTR") || be_u32_at(&buf, 4) != Some(1) {
                warn!(lang, "bad XSTR header");
                return Err(Error::BadMagic);
            }
            self.string_tables[slot] = Some(buf);
        }
        self.string_tables[slot]
            .as_deref()
            .ok_or(Error::Parse("string table not cached"))
    }

    /// String `id` from `lang`'s table, or `""`.
    pub fn load_string(&mut self, file: &SharedFile, lang: u8, id: u16) -> String {
        let Ok(table) = self.load_string_table(file, lang) else {
            return String::new();
        };
        find_string(table, id)
            .map(|s| dos2unix(&String::from_utf8_lossy(s)))
            .unwrap_or_default()
    }

    /// Default language declared by the XSTC resource.
    fn xstc_language(&self, file: &SharedFile) -> Option<u8> {
        let e = self.find_resource(NS_METADATA, XSTC)?;
        if e.length as usize != XSTC_SIZE {
            return None;
        }
        let buf = self
            .read_resource(file, e, XSTC_SIZE as u32, XSTC_SIZE as u32, "XSTC")
            .ok()?;
        if !buf.starts_with(b"XSTC")
            || be_u32_at(&buf, 4) != Some(1)
            || be_u32_at(&buf, 8) != Some((XSTC_SIZE - 4) as u32)
        {
            return None;
        }
        let lang = be_u32_at(&buf, 12)?;
        (lang > 0 && lang < LANG_MAX as u32).then_some(lang as u8)
    }

    /// Requested, XSTC default, English, then every other language with a
    /// table. Only languages with a table are listed.
    fn language_chain(&self, file: &SharedFile) -> Vec<u8> {
        let mut chain = Vec::with_capacity(LANG_MAX);
        let candidates = language_id(self.system_lang)
            .into_iter()
            .chain(self.xstc_language(file))
            .chain([LANG_ENGLISH])
            .chain(self.languages());
        for lang in candidates {
            if self.has_language(lang) && !chain.contains(&lang) {
                chain.push(lang);
            }
        }
        chain
    }

    /// Language used for single-language values, cached after the first call.
    pub fn language(&mut self, file: &SharedFile) -> Option<u8> {
        if self.lang_id.is_none() {
            for lang in self.language_chain(file) {
                if self.load_string_table(file, lang).is_ok() {
                    self.lang_id = Some(lang);
                    break;
                }
            }
        }
        self.lang_id
    }

    /// Default language code for multi-language fields.
    fn default_lc(&mut self, file: &SharedFile) -> u32 {
        self.language(file)
            .and_then(language_code)
            .unwrap_or(LC_EN)
    }

    /// String `id` from the first language in the fallback chain that has it.
    pub fn load_string_fallback(&mut self, file: &SharedFile, id: u16) -> String {
        for lang in self.language_chain(file) {
            let s = self.load_string(file, lang, id);
            if !s.is_empty() {
                return s;
            }
        }
        String::new()
    }

    /// Decode and cache image resource `id`. `Ok(None)` if there is none.
    pub fn load_resource_image(&mut self, file: &SharedFile, id: u64) -> Result<Option<Rc<Bitmap>>> {
        if let Some(img) = self.images.get(&id) {
            return Ok(Some(Rc::clone(img)));
        }
        let Some(e) = self.find_resource(NS_IMAGE, id) else {
            return Ok(None);
        };
        let buf = self.read_resource(file, e, MIN_IMAGE, MAX_IMAGE, "image")?;
        let img = Rc::new(decode_png(&buf)?);
        self.images.insert(id, Rc::clone(&img));
        Ok(Some(img))
    }

    /// Title type name from XTHD.
    fn title_header(&self, file: &SharedFile) -> Option<(u32, Option<&'static str>, [u16; 4])> {
        let e = self.find_resource(NS_METADATA, XTHD)?;
        let buf = self
            .read_resource(file, e, XTHD_SIZE as u32, XTHD_SIZE as u32, "XTHD")
            .ok()?;
        if !buf.starts_with(b"XTHD") {
            return None;
        }
        let mut r = cursor_at(&buf, 0x0C);
        let title_id = be_u32(&mut r).ok()?;
        let title_type = be_u32(&mut r).ok()?;
        let mut version = [0u16; 4];
        for v in &mut version {
            *v = be_u16(&mut r).ok()?;
        }
        Some((title_id, TITLE_TYPES.get(title_type as usize).copied(), version))
    }

    fn add_strings(&mut self, file: &SharedFile, settings: &Settings, fields: &mut FieldTable) {
        // Titles identical to the English one are dropped.
        let title_en = if self.has_language(LANG_ENGLISH) {
            self.load_string(file, LANG_ENGLISH, ID_TITLE as u16)
        } else {
            String::new()
        };
        let mut titles = BTreeMap::new();
        if !title_en.is_empty() {
            titles.insert(LC_EN, title_en.clone());
        }
        let others: Vec<u8> = self.languages().filter(|&l| l != LANG_ENGLISH).collect();
        for lang in others {
            let title = self.load_string(file, lang, ID_TITLE as u16);
            if title.is_empty() || (!title_en.is_empty() && title == title_en) {
                continue;
            }
            if let Some(lc) = language_code(lang) {
                titles.insert(lc, title);
            }
        }

        let name = settings.tr("RomData", "Title");
        if titles.is_empty() {
            fields.add_string(name, settings.tr("RomData", "Unknown"));
        } else {
            let def = self.default_lc(file);
            fields.add_multi_string(name, titles, def);
        }

        match self.title_header(file) {
            Some((title_id, title_type, v)) => {
                fields.add_string_numeric(
                    settings.tr("RomData", "Title ID"),
                    title_id,
                    Base::Hex,
                    8,
                    StringFlags::MONOSPACE,
                );
                fields.add_string(
                    settings.tr("RomData", "Type"),
                    settings.tr("Xbox360_XDBF|TitleType", title_type.unwrap_or("Unknown")),
                );
                fields.add_string(
                    settings.tr("RomData", "Version"),
                    format!("{}.{}.{}.{}", v[0], v[1], v[2], v[3]),
                );
            }
            None => {
                fields.add_string(
                    settings.tr("RomData", "Type"),
                    settings.tr("RomData", "Unknown"),
                );
            }
        }
    }

    /// Read a list resource (XACH or XGAA) and return its clamped entry slice.
    fn read_list(&self, file: &SharedFile, id: u64, magic: &[u8; 4], max_count: usize) -> Result<Option<Vec<u8>>> {
        let Some(e) = self.find_resource(NS_METADATA, id) else {
            return Ok(None);
        };
        let max = (LIST_HEADER_SIZE + LIST_ENTRY_SIZE * max_count) as u32;
        let buf = self.read_resource(file, e, LIST_HEADER_SIZE as u32, max, "list table")?;
        if !buf.starts_with(magic) || be_u32_at(&buf, 4) != Some(1) {
            return Err(Error::BadMagic);
        }
        Ok(Some(buf))
    }

    fn declared_count(buf: &[u8]) -> usize {
        buf.get(12..14)
            .map_or(0, |b| u16::from_be_bytes([b[0], b[1]]) as usize)
    }

    fn list_count(buf: &[u8], max_count: usize) -> usize {
        Self::declared_count(buf)
            .min(max_count)
            .min((buf.len() - LIST_HEADER_SIZE) / LIST_ENTRY_SIZE)
    }

    fn achievements(&self, file: &SharedFile) -> Result<Option<Vec<Award>>> {
        let Some(buf) = self.read_list(file, XACH, b"XACH", XACH_MAX_COUNT)? else {
            return Ok(None);
        };
        let count = Self::list_count(&buf, XACH_MAX_COUNT);
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let mut r = cursor_at(&buf, (LIST_HEADER_SIZE + i * LIST_ENTRY_SIZE) as u64);
            let id = be_u16(&mut r)?;
            let name_id = be_u16(&mut r)?;
            let unlocked_desc_id = be_u16(&mut r)?;
            let locked_desc_id = be_u16(&mut r)?;
            let image_id = be_u32(&mut r)?;
            let gamerscore = be_u16(&mut r)?;
            out.push(Award {
                id: id.to_string(),
                name_id,
                unlocked_desc_id,
                locked_desc_id,
                image_id,
                gamerscore: Some(gamerscore),
            });
        }
        Ok(Some(out))
    }

    fn avatar_awards(&self, file: &SharedFile) -> Result<Option<Vec<Award>>> {
        let Some(e) = self.find_resource(NS_METADATA, XGAA) else {
            return Ok(None);
        };
        // Built with an SDK that knows avatar awards, but has none.
        if e.length as usize == LIST_HEADER_SIZE {
            return Ok(None);
        }
        let Some(buf) = self.read_list(file, XGAA, b"XGAA", XGAA_MAX_COUNT)? else {
            return Ok(None);
        };
        if Self::declared_count(&buf) == 0 {
            return Err(Error::Parse("XGAA has no entries"));
        }
        let count = Self::list_count(&buf, XGAA_MAX_COUNT);
        let mut out = Vec::with_capacity(count);
        for i in 0..count {
            let mut r = cursor_at(&buf, (LIST_HEADER_SIZE + i * LIST_ENTRY_SIZE + 4) as u64);
            let id = be_u16(&mut r)?;
            let mut r = cursor_at(&buf, (LIST_HEADER_SIZE + i * LIST_ENTRY_SIZE + 0x0A) as u64);
            let name_id = be_u16(&mut r)?;
            let unlocked_desc_id = be_u16(&mut r)?;
            let locked_desc_id = be_u16(&mut r)?;
            let _ = be_u16(&mut r)?;
            let image_id = be_u32(&mut r)?;
            out.push(Award {
                id: format!("{id:04X}"),
                name_id,
                unlocked_desc_id,
                locked_desc_id,
                image_id,
                gamerscore: None,
            });
        }
        Ok(Some(out))
    }

    /// `id` in `lang`, falling back to English for this one string.
    fn string_or_english(&mut self, file: &SharedFile, lang: u8, id: u16) -> String {
        let s = self.load_string(file, lang, id);
        if s.is_empty() && lang != LANG_ENGLISH {
            return self.load_string(file, LANG_ENGLISH, id);
        }
        s
    }

    /// Pivot `awards` into one row set per language.
    fn award_list(
        &mut self,
        file: &SharedFile,
        awards: &[Award],
        headers: Vec<String>,
    ) -> Option<ListData> {
        let langs: Vec<u8> = self.languages().collect();
        if langs.is_empty() {
            return None;
        }
        let icons = awards
            .iter()
            .map(|a| self.load_resource_image(file, a.image_id as u64).ok().flatten())
            .collect();

        let mut per_lang = BTreeMap::new();
        for lang in langs {
            let Some(lc) = language_code(lang) else {
                continue;
            };
            let mut rows = Vec::with_capacity(awards.len());
            for a in awards {
                let mut desc = self.string_or_english(file, lang, a.name_id);
                let desc_id = if a.locked_desc_id != 0xFFFF {
                    a.locked_desc_id
                } else {
                    a.unlocked_desc_id
                };
                let locked = self.string_or_english(file, lang, desc_id);
                if !locked.is_empty() {
                    if !desc.is_empty() {
                        desc.push('\n');
                    }
                    desc.push_str(&locked);
                }
                let mut row = vec![a.id.clone(), desc];
                if let Some(score) = a.gamerscore {
                    row.push(score.to_string());
                }
                rows.push(row);
            }
            per_lang.insert(lc, rows);
        }

        let mut list = ListData::new(Some(headers), ListRows::PerLanguage(per_lang));
        list.flags = ListFlags::SEPARATE_ROW | ListFlags::ICONS;
        list.default_language = self.default_lc(file);
        list.icons = icons;
        Some(list)
    }

    fn add_awards(
        &mut self,
        file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        const AA: &str = "Xbox360_XDBF|AvatarAwards";
        if let Some(awards) = self.avatar_awards(file)? {
            let headers = vec![settings.tr(AA, "ID"), settings.tr(AA, "Description")];
            if let Some(list) = self.award_list(file, &awards, headers) {
                fields.add_list_data(settings.tr(CTX, "Avatar Awards"), list);
            }
        }
        Ok(())
    }

    fn add_achievements(
        &mut self,
        file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        const ACH: &str = "Xbox360_XDBF|Achievements";
        if let Some(awards) = self.achievements(file)? {
            let headers = vec![
                settings.tr(ACH, "ID"),
                settings.tr(ACH, "Description"),
                settings.tr(ACH, "Gamerscore"),
            ];
            if let Some(list) = self.award_list(file, &awards, headers) {
                fields.add_list_data(settings.tr(CTX, "Achievements"), list);
            }
        }
        Ok(())
    }
}

/// Bytes of string `id` in an XSTR table.
fn find_string(table: &[u8], id: u16) -> Option<&[u8]> {
    let mut p = XSTR_HEADER_SIZE;
    while p + 4 <= table.len() {
        let sid = u16::from_be_bytes([table[p], table[p + 1]]);
        let len = u16::from_be_bytes([table[p + 2], table[p + 3]]) as usize;
        let start = p + 4;
        if sid == id {
            return table.get(start..start + len);
        }
        p = start + len;
    }
    None
}

impl FormatParser for Xdbf {
    const CLASS_NAME: &'static str = "Xbox360_XDBF";
    const FILE_TYPE: FileType = FileType::ResourceLibrary;
    const EXTENSIONS: &'static [&'static str] = &[".xdbf", ".spa"];
    const MIME_TYPES: &'static [&'static str] = &["application/x-xbox360-xdbf"];

    fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
        if info.header_addr != 0 || info.header.len() < HEADER_SIZE {
            return None;
        }
        (info.header.starts_with(b"XDBF") && be_u32_at(info.header, 4) == Some(VERSION))
            .then_some(0)
    }

    fn open(file: &SharedFile, settings: &Settings) -> Result<Self> {
        Self::parse(file, settings)
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        pick_name(&["Microsoft Xbox 360", "Xbox 360", "X360"], kind)
    }

    fn image_types() -> ImageTypes {
        ImageTypes::of(ImageType::IntIcon)
    }

    fn image_sizes(_t: ImageType) -> Vec<ImageSizeDef> {
        vec![ImageSizeDef::new(64, 64)]
    }

    fn image_processing(_t: ImageType) -> ImageProcessing {
        ImageProcessing::NEAREST_NEIGHBOR
    }

    fn load_fields(
        &mut self,
        file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()> {
        fields.set_tab_name(0, "XDBF");
        self.add_strings(file, settings, fields);

        // Avatar awards first: achievements take up the rest of the space.
        if let Err(e) = self.add_awards(file, settings, fields) {
            warn!("XGAA: {e}");
        }
        if let Err(e) = self.add_achievements(file, settings, fields) {
            warn!("XACH: {e}");
        }
        Ok(())
    }

    fn load_metadata(
        &mut self,
        file: &SharedFile,
        _settings: &Settings,
        meta: &mut MetadataSet,
    ) -> Result<()> {
        let title = self.load_string_fallback(file, ID_TITLE as u16);
        meta.add_string(Property::Title, title);
        Ok(())
    }

    fn load_image(&mut self, file: &SharedFile, _t: ImageType) -> Result<Option<Rc<Bitmap>>> {
        let icon = self.load_resource_image(file, ID_TITLE)?;
        if icon.is_none() {
            trace!("no title icon");
        }
        Ok(icon)
    }
}
