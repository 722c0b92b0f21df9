//! Format handlers.
//!
//! Each submodule implements [`FormatParser`](crate::handler::FormatParser)
//! for one format family. Parsers share a few conventions:
//!
//! * **Cheap open** - `open` reads and validates the fixed header only.
//!   Fields, metadata and images are produced on first request and cached
//!   by [`RomData`](crate::handler::RomData).
//! * **Positional reads** - all I/O goes through
//!   [`SharedFile`](crate::file::SharedFile), so several handlers may share
//!   one file.
//! * **Bounded allocation** - variable-size blocks are checked against a
//!   ceiling before they are read.
//!
//! ## Format overview
//!
//! | Module          | Format | Description |
//! |-----------------|--------|-------------|
//! | [`xdbf`]        | XDBF   | Xbox 360 SPA/GPD resource database with string tables and PNG images |
//! | [`smdh`]        | SMDH   | Nintendo 3DS icon and title block |
//! | [`dmg`]         | GB/GBC | Game Boy / Game Boy Color ROM header |
//! | [`gbs`]         | GBS    | Game Boy Sound System rip |
//! | [`vgm`]         | VGM    | Video Game Music log with GD3 tags |
//! | [`dc_save`]     | VMS/VMI | Dreamcast VMU save and its index file |
//! | [`gcn_bnr`]     | BNR    | GameCube `opening.bnr` banner |
//! | [`sid`]         | PSID/RSID | Commodore 64 SID music |
//! | [`gamecom`]     | game.com | Tiger game.com ROM |
//! | [`wonderswan`]  | WS/WSC | Bandai WonderSwan ROM, identified by its footer |

pub mod dc_save;
pub mod dmg;
pub mod gamecom;
pub mod gbs;
pub mod gcn_bnr;
pub mod sid;
pub mod smdh;
pub mod vgm;
pub mod wonderswan;
pub mod xdbf;
