//! **romkit** - identify game ROMs, saves and resource files, and read
//! their fields, metadata and icons.
//!
//! ```no_run
//! use romkit::{Attrs, Detector};
//!
//! let mut h = Detector::new().open_path("game.gbc", Attrs::NONE)?;
//! println!("{:?}", h.system_name(romkit::SystemNameKind::Long));
//! for f in h.fields()?.iter() {
//!     println!("{}: {:?}", f.name, f.value);
//! }
//! # Ok::<(), romkit::Error>(())
//! ```
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`formats::xdbf`]       | XDBF - Xbox 360 SPA/GPD resource database |
//! | [`formats::smdh`]       | SMDH - Nintendo 3DS icon and title block |
//! | [`formats::dmg`]        | Game Boy / Game Boy Color ROM |
//! | [`formats::gbs`]        | GBS - Game Boy Sound System |
//! | [`formats::vgm`]        | VGM - Video Game Music log |
//! | [`formats::dc_save`]    | Dreamcast VMS/VMI save |
//! | [`formats::gcn_bnr`]    | GameCube `opening.bnr` banner |
//! | [`formats::sid`]        | PSID/RSID - Commodore 64 music |
//! | [`formats::gamecom`]    | Tiger game.com ROM |
//! | [`formats::wonderswan`] | Bandai WonderSwan / WonderSwan Color ROM |

pub mod catalog;
pub mod config;
pub mod detector;
pub mod error;
pub mod fields;
pub mod file;
pub mod formats;
pub mod handler;
pub mod image;
pub mod metadata;
pub mod text;
pub(crate) mod utils;

pub use catalog::{Attrs, ExtInfo, supported_extensions, supported_mime_types};
pub use config::Settings;
pub use detector::{DetectInfo, Detector, DetectorConfig, create};
pub use error::{Error, Result};
pub use fields::{Field, FieldTable, FieldValue};
pub use file::{DiskFile, MemFile, RomFile, SharedFile};
pub use handler::{FileType, FormatHandler, FormatParser, RomData, SystemNameKind};
pub use image::{Bitmap, IconAnim, ImageType};
pub use metadata::{MetaValue, MetadataSet, Property};
