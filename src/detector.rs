//! Format detection.
//!
//! [`Detector::create`] reads one header window from the start of the
//! file and walks the [`catalog`](crate::catalog) in three stages:
//!
//! | Stage  | Window | Gate |
//! |--------|--------|------|
//! | magic  | initial header window | `u32` compare, then `is_supported` |
//! | header | initial window, or a re-read at the descriptor's address | re-read only for allow-listed extensions |
//! | footer | trailing window, read at most once | file size ceiling, extension match |
//!
//! A `.vms`/`.vmi` file is first tried together with its sibling.

use std::path::Path;

use tracing::{debug, trace};

use crate::catalog::{self, Attrs, FormatDescriptor, MatchRule};
use crate::config::Settings;
use crate::file::SharedFile;
use crate::formats::dc_save;
use crate::handler::FormatHandler;
use crate::utils::be_u32_at;
use crate::{Error, Result};

/// What an `is_supported` predicate looks at.
#[derive(Debug, Clone, Copy)]
pub struct DetectInfo<'a> {
    /// Bytes of the window.
    pub header: &'a [u8],
    /// File offset of `header[0]`.
    pub header_addr: u64,
    /// Total file size.
    pub file_size: u64,
    /// File extension with the leading dot, if known.
    pub ext: Option<&'a str>,
}

impl<'a> DetectInfo<'a> {
    pub fn new(header: &'a [u8], header_addr: u64, file_size: u64, ext: Option<&'a str>) -> Self {
        Self {
            header,
            header_addr,
            file_size,
            ext,
        }
    }

    /// True if the extension equals any of `exts`, ignoring ASCII case.
    pub fn ext_is(&self, exts: &[&str]) -> bool {
        self.ext
            .is_some_and(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

/// Tunables for [`Detector`].
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub header_size: usize,
    pub footer_size: usize,
    /// Files larger than this skip the footer stage.
    pub footer_max_file_size: u64,
    /// Extensions for which a header window may be re-read at another offset.
    pub reread_exts: Vec<String>,
    /// Try `.vms`/`.vmi` siblings together.
    pub paired: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            header_size: 4096 + 256,
            footer_size: 1024,
            footer_max_file_size: 1 << 30,
            reread_exts: [".bin", ".sms", ".gg", ".tgc"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            paired: true,
        }
    }
}

impl DetectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_size(mut self, n: usize) -> Self {
        self.header_size = n;
        self
    }

    pub fn footer_size(mut self, n: usize) -> Self {
        self.footer_size = n;
        self
    }

    pub fn footer_max_file_size(mut self, n: u64) -> Self {
        self.footer_max_file_size = n;
        self
    }

    pub fn reread_exts<S: Into<String>>(mut self, exts: impl IntoIterator<Item = S>) -> Self {
        self.reread_exts = exts.into_iter().map(Into::into).collect();
        self
    }

    pub fn paired(mut self, on: bool) -> Self {
        self.paired = on;
        self
    }

    fn may_reread(&self, ext: Option<&str>) -> bool {
        ext.is_some_and(|e| self.reread_exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

/// Picks and constructs the handler for a file.
#[derive(Debug, Clone, Default)]
pub struct Detector {
    config: DetectorConfig,
    settings: Settings,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Open the file at `path` and detect it.
    ///
    /// Returns [`Error::UnsupportedFormat`] if nothing matches.
    pub fn open_path(&self, path: impl AsRef<Path>, attrs: Attrs) -> Result<Box<dyn FormatHandler>> {
        let file = SharedFile::open(path)?;
        self.create(&file, attrs).ok_or(Error::UnsupportedFormat)
    }

    /// First valid handler for `file` whose attributes include `attrs`.
    pub fn create(&self, file: &SharedFile, attrs: Attrs) -> Option<Box<dyn FormatHandler>> {
        let header = match file.read_upto(0, self.config.header_size) {
            Ok(h) if !h.is_empty() => h,
            Ok(_) => {
                debug!("empty file");
                return None;
            }
            Err(e) => {
                debug!("reading header failed: {e}");
                return None;
            }
        };
        let size = file.size();
        let ext = file.extension();
        let ext = ext.as_deref();

        if self.config.paired
            && Attrs::HAS_THUMBNAIL.satisfies(attrs)
            && let Some(h) = dc_save::open_pair(file, &self.settings)
        {
            debug!("paired save: {}", h.class_name());
            return Some(h);
        }

        debug!(size, ?ext, "magic stage");
        for d in catalog::MAGIC {
            if !d.attrs.satisfies(attrs) {
                continue;
            }
            let MatchRule::Magic { addr, magic } = d.rule else {
                continue;
            };
            if be_u32_at(&header, addr as usize) != Some(magic) {
                continue;
            }
            let info = DetectInfo::new(&header, 0, size, ext);
            if let Some(h) = self.try_open(d, &info, file) {
                return Some(h);
            }
        }

        debug!("header stage");
        let mut window = header.clone();
        let mut window_addr = 0u64;
        for d in catalog::HEADER {
            if !d.attrs.satisfies(attrs) {
                continue;
            }
            let MatchRule::Header { addr, size: len } = d.rule else {
                continue;
            };
            let (addr, len) = (addr as u64, len as usize);
            if addr != window_addr || len > window.len() {
                if !self.config.may_reread(ext) {
                    trace!(name = d.name, "re-read not allowed for {ext:?}");
                    break;
                }
                if len == 0 || len > self.config.header_size {
                    continue;
                }
                if addr + len as u64 > size {
                    continue;
                }
                match file.read_upto(addr, len) {
                    Ok(buf) if buf.len() == len => {
                        window = buf;
                        window_addr = addr;
                    }
                    _ => continue,
                }
            }
            let info = DetectInfo::new(&window, window_addr, size, ext);
            if let Some(h) = self.try_open(d, &info, file) {
                return Some(h);
            }
        }

        if size > self.config.footer_max_file_size {
            debug!(size, "too large for footer stage");
            return None;
        }
        debug!("footer stage");
        let mut footer: Option<(Vec<u8>, u64)> = None;
        for d in catalog::FOOTER {
            if !d.attrs.satisfies(attrs) {
                continue;
            }
            if !ext.is_some_and(|e| d.handles_extension(e)) {
                continue;
            }
            if footer.is_none() {
                let addr = size.saturating_sub(self.config.footer_size as u64);
                match file.read_upto(addr, self.config.footer_size) {
                    Ok(buf) if !buf.is_empty() => footer = Some((buf, addr)),
                    Ok(_) => {
                        debug!(addr, "empty footer window");
                        return None;
                    }
                    Err(e) => {
                        debug!("reading footer failed: {e}");
                        return None;
                    }
                }
            }
            let Some((buf, addr)) = footer.as_ref() else {
                return None;
            };
            let info = DetectInfo::new(buf, *addr, size, ext);
            if let Some(h) = self.try_open(d, &info, file) {
                return Some(h);
            }
        }

        debug!("no format matched");
        None
    }

    fn try_open(
        &self,
        d: &FormatDescriptor,
        info: &DetectInfo<'_>,
        file: &SharedFile,
    ) -> Option<Box<dyn FormatHandler>> {
        if (d.is_supported)(info).is_none() {
            trace!(name = d.name, "not supported");
            return None;
        }
        match (d.open)(file, &self.settings) {
            Some(h) => {
                debug!(name = d.name, "matched");
                Some(h)
            }
            None => {
                trace!(name = d.name, "constructed invalid");
                None
            }
        }
    }
}

/// [`Detector::create`] with default configuration and settings.
pub fn create(file: &SharedFile, attrs: Attrs) -> Option<Box<dyn FormatHandler>> {
    Detector::new().create(file, attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{MemFile, RomFile};
    use crate::formats::wonderswan;
    use std::io::{self, Read, Seek, SeekFrom};

    /// Reads fail at or past `bad_from`.
    struct BadTail {
        inner: MemFile,
        bad_from: u64,
    }

    impl Read for BadTail {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.stream_position()? >= self.bad_from {
                return Err(io::Error::other("unreadable sector"));
            }
            self.inner.read(buf)
        }
    }

    impl Seek for BadTail {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl RomFile for BadTail {
        fn size(&self) -> u64 {
            self.inner.size()
        }

        fn filename(&self) -> Option<&str> {
            self.inner.filename()
        }
    }

    #[test]
    fn test_unreadable_footer() {
        let rom = wonderswan::tests::rom(0);
        let ok = SharedFile::new(MemFile::with_name(rom.clone(), "g.ws"));
        assert!(create(&ok, Attrs::NONE).is_some());

        let bad = SharedFile::new(BadTail {
            inner: MemFile::with_name(rom, "g.ws"),
            bad_from: 0x8000,
        });
        assert!(create(&bad, Attrs::NONE).is_none());
    }

    #[test]
    fn test_empty_file() {
        let file = SharedFile::new(MemFile::with_name(Vec::new(), "empty.xdbf"));
        assert!(create(&file, Attrs::NONE).is_none());
    }

    #[test]
    fn test_unknown_data() {
        let file = SharedFile::new(MemFile::with_name(vec![0x5A; 8192], "junk.dat"));
        assert!(create(&file, Attrs::NONE).is_none());
    }

    #[test]
    fn test_detect_info_ext() {
        let info = DetectInfo::new(&[], 0, 0, Some(".TGC"));
        assert!(info.ext_is(&[".bin", ".tgc"]));
        assert!(!DetectInfo::new(&[], 0, 0, None).ext_is(&[".tgc"]));
    }

    #[test]
    fn test_config_builder() {
        let c = DetectorConfig::new()
            .header_size(512)
            .paired(false)
            .reread_exts([".rom"]);
        assert_eq!(c.header_size, 512);
        assert!(!c.paired);
        assert!(c.may_reread(Some(".ROM")));
        assert!(!c.may_reread(Some(".bin")));
        assert!(!c.may_reread(None));
        assert_eq!(DetectorConfig::default().footer_size, 1024);
    }
}
