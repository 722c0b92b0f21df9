//! The per-format handler contract.
//!
//! Callers only ever see [`FormatHandler`] trait objects. Formats implement
//! the smaller [`FormatParser`] trait and are wrapped in [`RomData`], which
//! owns the shared file and the lazily built caches so every format gets
//! the same "build once, then return the cached value" behavior.

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::warn;

use crate::config::Settings;
use crate::detector::DetectInfo;
use crate::fields::FieldTable;
use crate::file::SharedFile;
use crate::image::{Bitmap, IconAnim, ImageProcessing, ImageSizeDef, ImageType, ImageTypes};
use crate::metadata::MetadataSet;
use crate::{Error, Result};

/// Which variant of the system name to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemNameKind {
    /// e.g. "Nintendo Game Boy Color"
    Long,
    /// e.g. "Game Boy Color"
    Short,
    /// e.g. "GBC"
    Abbreviation,
}

impl SystemNameKind {
    /// Index into a `[long, short, abbreviation]` table.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Broad category of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Unknown,
    RomImage,
    SaveFile,
    AudioFile,
    BannerFile,
    IconFile,
    ResourceLibrary,
}

/// A handler bound to one open file.
///
/// The detector only hands out valid handlers, but a handler can outlive
/// its file via [`close`](FormatHandler::close); loaders then fail with
/// [`Error::NotOpen`] while already cached values stay available.
pub trait FormatHandler {
    fn is_valid(&self) -> bool;

    /// Stable format name, e.g. `"Xbox360_XDBF"`.
    fn class_name(&self) -> &'static str;

    fn file_type(&self) -> FileType;

    /// `None` if the handler is invalid.
    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str>;

    fn supported_image_types(&self) -> ImageTypes;

    fn supported_image_sizes(&self, t: ImageType) -> Vec<ImageSizeDef>;

    fn image_processing_flags(&self, t: ImageType) -> ImageProcessing;

    /// Build the field table on first call; later calls return the cache.
    fn fields(&mut self) -> Result<&FieldTable>;

    /// Build the metadata set on first call; later calls return the cache.
    fn metadata(&mut self) -> Result<&MetadataSet>;

    /// Decode image `t` on first call; later calls return the cache.
    ///
    /// `Ok(None)` means this file has no such image;
    /// [`Error::NotApplicable`] means the format never has one.
    fn image(&mut self, t: ImageType) -> Result<Option<&Bitmap>>;

    /// Animated icon frames, decoded once. `Ok(None)` for a still icon.
    fn icon_anim(&mut self) -> Result<Option<&IconAnim>>;

    /// The file this handler reads from, while open.
    fn file(&self) -> Option<&SharedFile>;

    /// Release this handler's reference to the file.
    fn close(&mut self);
}

/// What a format implements.
pub trait FormatParser: Sized {
    const CLASS_NAME: &'static str;
    const FILE_TYPE: FileType;
    /// Extensions with the leading dot.
    const EXTENSIONS: &'static [&'static str];
    const MIME_TYPES: &'static [&'static str];

    /// Class-specific type id if the window in `info` looks like this format.
    fn is_supported(info: &DetectInfo<'_>) -> Option<u32>;

    /// Read just enough to decide validity.
    fn open(file: &SharedFile, settings: &Settings) -> Result<Self>;

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str>;

    fn image_types() -> ImageTypes {
        ImageTypes::NONE
    }

    fn image_sizes(_t: ImageType) -> Vec<ImageSizeDef> {
        Vec::new()
    }

    fn image_processing(_t: ImageType) -> ImageProcessing {
        ImageProcessing::NONE
    }

    fn load_fields(
        &mut self,
        file: &SharedFile,
        settings: &Settings,
        fields: &mut FieldTable,
    ) -> Result<()>;

    fn load_metadata(
        &mut self,
        _file: &SharedFile,
        _settings: &Settings,
        _meta: &mut MetadataSet,
    ) -> Result<()> {
        Ok(())
    }

    fn load_image(&mut self, _file: &SharedFile, _t: ImageType) -> Result<Option<Rc<Bitmap>>> {
        Err(Error::NotApplicable)
    }

    fn load_icon_anim(&mut self, _file: &SharedFile) -> Result<Option<IconAnim>> {
        Ok(None)
    }
}

/// [`FormatHandler`] over any [`FormatParser`].
pub struct RomData<P> {
    file: Option<SharedFile>,
    settings: Settings,
    parser: Option<P>,
    fields: Option<FieldTable>,
    metadata: Option<MetadataSet>,
    images: BTreeMap<ImageType, Option<Rc<Bitmap>>>,
    icon_anim: Option<Option<IconAnim>>,
}

impl<P: FormatParser> RomData<P> {
    /// Open `file` as `P`. On failure the handler is invalid and holds no
    /// file reference.
    pub fn new(file: SharedFile, settings: &Settings) -> Self {
        match P::open(&file, settings) {
            Ok(parser) => Self::from_parser(file, settings, parser),
            Err(_) => Self {
                file: None,
                settings: settings.clone(),
                parser: None,
                fields: None,
                metadata: None,
                images: BTreeMap::new(),
                icon_anim: None,
            },
        }
    }

    /// Wrap an already opened parser.
    pub fn from_parser(file: SharedFile, settings: &Settings, parser: P) -> Self {
        Self {
            file: Some(file),
            settings: settings.clone(),
            parser: Some(parser),
            fields: None,
            metadata: None,
            images: BTreeMap::new(),
            icon_anim: None,
        }
    }

    pub fn parser(&self) -> Option<&P> {
        self.parser.as_ref()
    }

    fn parts(&mut self) -> Result<(&mut P, &SharedFile, &Settings)> {
        let parser = self.parser.as_mut().ok_or(Error::UnsupportedFormat)?;
        let file = self.file.as_ref().ok_or(Error::NotOpen)?;
        Ok((parser, file, &self.settings))
    }
}

impl<P: FormatParser> FormatHandler for RomData<P> {
    fn is_valid(&self) -> bool {
        self.parser.is_some()
    }

    fn class_name(&self) -> &'static str {
        P::CLASS_NAME
    }

    fn file_type(&self) -> FileType {
        P::FILE_TYPE
    }

    fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
        self.parser.as_ref()?.system_name(kind)
    }

    fn supported_image_types(&self) -> ImageTypes {
        P::image_types()
    }

    fn supported_image_sizes(&self, t: ImageType) -> Vec<ImageSizeDef> {
        if P::image_types().contains(t) {
            P::image_sizes(t)
        } else {
            Vec::new()
        }
    }

    fn image_processing_flags(&self, t: ImageType) -> ImageProcessing {
        if P::image_types().contains(t) {
            P::image_processing(t)
        } else {
            ImageProcessing::NONE
        }
    }

    fn fields(&mut self) -> Result<&FieldTable> {
        if self.fields.is_none() {
            let (parser, file, settings) = self.parts()?;
            let mut table = FieldTable::new();
            if let Err(e) = parser.load_fields(file, settings, &mut table) {
                warn!("{}: loading fields failed: {e}", P::CLASS_NAME);
                return Err(e);
            }
            self.fields = Some(table);
        }
        Ok(self.fields.get_or_insert_default())
    }

    fn metadata(&mut self) -> Result<&MetadataSet> {
        if self.metadata.is_none() {
            let (parser, file, settings) = self.parts()?;
            let mut meta = MetadataSet::new();
            if let Err(e) = parser.load_metadata(file, settings, &mut meta) {
                warn!("{}: loading metadata failed: {e}", P::CLASS_NAME);
                return Err(e);
            }
            self.metadata = Some(meta);
        }
        Ok(self.metadata.get_or_insert_default())
    }

    fn image(&mut self, t: ImageType) -> Result<Option<&Bitmap>> {
        if !P::image_types().contains(t) {
            return Err(Error::NotApplicable);
        }
        if !self.images.contains_key(&t) {
            let (parser, file, _) = self.parts()?;
            let img = parser.load_image(file, t)?;
            self.images.insert(t, img);
        }
        Ok(self.images.get(&t).and_then(|img| img.as_deref()))
    }

    fn icon_anim(&mut self) -> Result<Option<&IconAnim>> {
        if !P::image_types().contains(ImageType::IntIcon) {
            return Err(Error::NotApplicable);
        }
        if self.icon_anim.is_none() {
            let (parser, file, _) = self.parts()?;
            let anim = parser.load_icon_anim(file)?;
            self.icon_anim = Some(anim);
        }
        Ok(self.icon_anim.as_ref().and_then(Option::as_ref))
    }

    fn file(&self) -> Option<&SharedFile> {
        self.file.as_ref()
    }

    fn close(&mut self) {
        self.file = None;
    }
}

/// Constructor stored in the catalog: open `file` as `P`, keep it only if
/// it validates.
pub(crate) fn open_boxed<P: FormatParser + 'static>(
    file: &SharedFile,
    settings: &Settings,
) -> Option<Box<dyn FormatHandler>> {
    let rd = RomData::<P>::new(file.clone(), settings);
    if rd.is_valid() {
        Some(Box::new(rd))
    } else {
        None
    }
}

/// Pick `[long, short, abbreviation][kind]`.
#[inline]
pub(crate) fn pick_name(names: &[&'static str; 3], kind: SystemNameKind) -> Option<&'static str> {
    names.get(kind.index()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemFile;
    use std::cell::Cell;

    thread_local! {
        static LOADS: Cell<u32> = const { Cell::new(0) };
    }

    struct Stub {
        fail_once: bool,
    }

    impl FormatParser for Stub {
        const CLASS_NAME: &'static str = "Stub";
        const FILE_TYPE: FileType = FileType::Unknown;
        const EXTENSIONS: &'static [&'static str] = &[".stub"];
        const MIME_TYPES: &'static [&'static str] = &[];

        fn is_supported(info: &DetectInfo<'_>) -> Option<u32> {
            info.header.starts_with(b"PROB").then_some(0)
        }

        fn open(file: &SharedFile, _settings: &Settings) -> Result<Self> {
            let hdr = file.read_upto(0, 4)?;
            let info = DetectInfo::new(&hdr, 0, file.size(), None);
            Self::is_supported(&info).ok_or(Error::BadMagic)?;
            Ok(Self { fail_once: true })
        }

        fn system_name(&self, kind: SystemNameKind) -> Option<&'static str> {
            pick_name(&["Stub System", "Stub", "PRB"], kind)
        }

        fn image_types() -> ImageTypes {
            ImageTypes::of(ImageType::IntIcon)
        }

        fn load_fields(
            &mut self,
            _file: &SharedFile,
            _settings: &Settings,
            fields: &mut FieldTable,
        ) -> Result<()> {
            LOADS.with(|c| c.set(c.get() + 1));
            if self.fail_once {
                self.fail_once = false;
                return Err(Error::Parse("first load fails"));
            }
            fields.add_string("Name", "stub");
            Ok(())
        }

        fn load_image(&mut self, _file: &SharedFile, _t: ImageType) -> Result<Option<Rc<Bitmap>>> {
            Ok(None)
        }
    }

    fn stub(data: &[u8]) -> RomData<Stub> {
        let file = SharedFile::new(MemFile::new(data.to_vec()));
        RomData::new(file, &Settings::default())
    }

    #[test]
    fn test_invalid_releases_file() {
        let file = SharedFile::new(MemFile::new(b"NOPE".to_vec()));
        let mut rd = RomData::<Stub>::new(file.clone(), &Settings::default());
        assert!(!rd.is_valid());
        assert_eq!(file.handle_count(), 1);
        assert!(rd.system_name(SystemNameKind::Long).is_none());
        assert!(rd.fields().is_err());
    }

    #[test]
    fn test_failed_load_can_retry_then_caches() {
        LOADS.with(|c| c.set(0));
        let mut rd = stub(b"PROB");
        assert!(rd.fields().is_err());
        let first = rd.fields().unwrap() as *const FieldTable;
        let second = rd.fields().unwrap() as *const FieldTable;
        assert_eq!(first, second);
        assert_eq!(LOADS.with(Cell::get), 2);
    }

    #[test]
    fn test_image_applicability() {
        let mut rd = stub(b"PROB");
        assert!(matches!(rd.image(ImageType::IntBanner), Err(Error::NotApplicable)));
        assert!(rd.image(ImageType::IntIcon).unwrap().is_none());
        assert!(rd.icon_anim().unwrap().is_none());
        assert!(rd.supported_image_sizes(ImageType::IntBanner).is_empty());
    }

    #[test]
    fn test_close_keeps_cache() {
        let mut rd = stub(b"PROB");
        let _ = rd.fields();
        assert!(rd.fields().is_ok());
        rd.close();
        assert!(rd.file().is_none());
        assert!(rd.fields().is_ok());
        assert!(matches!(rd.metadata(), Err(Error::NotOpen)));
        assert_eq!(rd.system_name(SystemNameKind::Abbreviation), Some("PRB"));
    }
}
