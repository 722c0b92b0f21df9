//! Decoded images and the pixel decoders the formats need.
//!
//! Every decoder produces a [`Bitmap`] in ARGB32 (`0xAARRGGBB`), which is
//! the only pixel format handed to renderers.

use std::io::Cursor;
use std::ops::BitOr;
use std::rc::Rc;

use crate::utils::slice;
use crate::{Error, Result};

/// Largest width or height accepted from an embedded image.
const MAX_DIMENSION: u32 = 4096;

/// ARGB32 pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Bitmap {
    /// Fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    /// Wrap existing ARGB32 pixels; `pixels.len()` must equal `width * height`.
    pub fn from_argb32(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self> {
        if pixels.len() != width as usize * height as usize {
            return Err(Error::Parse("pixel count does not match dimensions"));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major ARGB32 pixels.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Pixel at (`x`, `y`), or `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    #[inline]
    pub(crate) fn set(&mut self, x: u32, y: u32, argb: u32) {
        let idx = y as usize * self.width as usize + x as usize;
        if let Some(p) = self.pixels.get_mut(idx) {
            *p = argb;
        }
    }
}

/// Frames of an animated icon, shown in order and looped.
#[derive(Debug, Clone, PartialEq)]
pub struct IconAnim {
    pub frames: Vec<Rc<Bitmap>>,
    /// How long each frame stays up, in milliseconds.
    pub delays_ms: Vec<u32>,
}

/// Image slots a handler may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ImageType {
    /// Icon embedded in the file.
    IntIcon = 0,
    /// Banner embedded in the file.
    IntBanner = 1,
    /// Media scan embedded in the file.
    IntMedia = 2,
    /// Generic image embedded in the file.
    IntImage = 3,
}

impl ImageType {
    pub const ALL: [ImageType; 4] = [
        ImageType::IntIcon,
        ImageType::IntBanner,
        ImageType::IntMedia,
        ImageType::IntImage,
    ];
}

/// Set of [`ImageType`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageTypes(u32);

impl ImageTypes {
    pub const NONE: ImageTypes = ImageTypes(0);

    pub const fn of(t: ImageType) -> Self {
        ImageTypes(1 << t as u32)
    }

    pub const fn contains(self, t: ImageType) -> bool {
        self.0 & (1 << t as u32) != 0
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ImageTypes {
    type Output = ImageTypes;

    fn bitor(self, rhs: Self) -> Self {
        ImageTypes(self.0 | rhs.0)
    }
}

impl BitOr<ImageType> for ImageTypes {
    type Output = ImageTypes;

    fn bitor(self, rhs: ImageType) -> Self {
        self | ImageTypes::of(rhs)
    }
}

/// One size an image type is available in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSizeDef {
    /// Optional label (e.g. "small").
    pub name: Option<&'static str>,
    pub width: u16,
    pub height: u16,
    /// Format-specific variant index.
    pub index: u16,
}

impl ImageSizeDef {
    pub const fn new(width: u16, height: u16) -> Self {
        Self {
            name: None,
            width,
            height,
            index: 0,
        }
    }
}

/// Rendering hints for an image type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageProcessing(u32);

impl ImageProcessing {
    pub const NONE: ImageProcessing = ImageProcessing(0);
    /// Scale with nearest-neighbor instead of interpolation.
    pub const NEAREST_NEIGHBOR: ImageProcessing = ImageProcessing(1 << 0);

    pub const fn contains(self, other: ImageProcessing) -> bool {
        self.0 & other.0 == other.0
    }
}

#[inline]
fn expand5(v: u16) -> u32 {
    let v = (v & 0x1F) as u32;
    (v << 3) | (v >> 2)
}

#[inline]
fn expand6(v: u16) -> u32 {
    let v = (v & 0x3F) as u32;
    (v << 2) | (v >> 4)
}

#[inline]
fn expand4(v: u16) -> u32 {
    (v & 0x0F) as u32 * 0x11
}

#[inline]
fn argb(a: u32, r: u32, g: u32, b: u32) -> u32 {
    (a << 24) | (r << 16) | (g << 8) | b
}

/// GameCube RGB5A3 pixel.
pub fn rgb5a3_to_argb32(px: u16) -> u32 {
    if px & 0x8000 != 0 {
        argb(0xFF, expand5(px >> 10), expand5(px >> 5), expand5(px))
    } else {
        let a = ((px >> 12) & 0x7) as u32;
        let a = (a << 5) | (a << 2) | (a >> 1);
        argb(a, expand4(px >> 8), expand4(px >> 4), expand4(px))
    }
}

/// RGB565 pixel, always opaque.
pub fn rgb565_to_argb32(px: u16) -> u32 {
    argb(0xFF, expand5(px >> 11), expand6(px >> 5), expand5(px))
}

/// ARGB4444 pixel.
pub fn argb4444_to_argb32(px: u16) -> u32 {
    argb(expand4(px >> 12), expand4(px >> 8), expand4(px >> 4), expand4(px))
}

fn check_dims(width: u32, height: u32, tile: u32) -> Result<()> {
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::Parse("image dimensions out of range"));
    }
    if width % tile != 0 || height % tile != 0 {
        return Err(Error::Parse("image dimensions are not tile-aligned"));
    }
    Ok(())
}

/// GameCube RGB5A3 in 4x4 tiles, big-endian.
pub fn decode_rgb5a3_tiled(width: u32, height: u32, data: &[u8]) -> Result<Bitmap> {
    check_dims(width, height, 4)?;
    let data = slice(data, 0, width as usize * height as usize * 2)?;
    let mut img = Bitmap::new(width, height);
    let mut px = data.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
    for ty in (0..height).step_by(4) {
        for tx in (0..width).step_by(4) {
            for y in 0..4 {
                for x in 0..4 {
                    let v = px.next().ok_or(Error::Truncated)?;
                    img.set(tx + x, ty + y, rgb5a3_to_argb32(v));
                }
            }
        }
    }
    Ok(img)
}

/// Position of (`x`, `y`) inside an 8x8 Morton-ordered tile.
#[inline]
fn morton8(x: u32, y: u32) -> u32 {
    (x & 1) | ((y & 1) << 1) | ((x & 2) << 1) | ((y & 2) << 2) | ((x & 4) << 2) | ((y & 4) << 3)
}

/// Nintendo 3DS RGB565 in 8x8 Morton-ordered tiles, little-endian.
pub fn decode_rgb565_3ds(width: u32, height: u32, data: &[u8]) -> Result<Bitmap> {
    check_dims(width, height, 8)?;
    let data = slice(data, 0, width as usize * height as usize * 2)?;
    let mut img = Bitmap::new(width, height);
    let tiles_per_row = width / 8;
    for ty in 0..height / 8 {
        for tx in 0..tiles_per_row {
            let tile_base = ((ty * tiles_per_row + tx) * 64) as usize;
            for y in 0..8 {
                for x in 0..8 {
                    let i = (tile_base + morton8(x, y) as usize) * 2;
                    let v = u16::from_le_bytes([data[i], data[i + 1]]);
                    img.set(tx * 8 + x, ty * 8 + y, rgb565_to_argb32(v));
                }
            }
        }
    }
    Ok(img)
}

/// Linear 4bpp indexed pixels (high nibble first) with an ARGB4444 palette.
pub fn decode_ci4_argb4444(
    width: u32,
    height: u32,
    data: &[u8],
    palette: &[u16; 16],
) -> Result<Bitmap> {
    check_dims(width, height, 2)?;
    let data = slice(data, 0, width as usize * height as usize / 2)?;
    let pal: Vec<u32> = palette.iter().map(|&c| argb4444_to_argb32(c)).collect();
    let mut img = Bitmap::new(width, height);
    for (i, &b) in data.iter().enumerate() {
        let p = (i * 2) as u32;
        let (x, y) = (p % width, p / width);
        img.set(x, y, pal[(b >> 4) as usize]);
        img.set(x + 1, y, pal[(b & 0x0F) as usize]);
    }
    Ok(img)
}

/// Linear ARGB4444, little-endian.
pub fn decode_argb4444(width: u32, height: u32, data: &[u8]) -> Result<Bitmap> {
    check_dims(width, height, 1)?;
    let data = slice(data, 0, width as usize * height as usize * 2)?;
    let pixels = data
        .chunks_exact(2)
        .map(|c| argb4444_to_argb32(u16::from_le_bytes([c[0], c[1]])))
        .collect();
    Bitmap::from_argb32(width, height, pixels)
}

/// Linear 8bpp indexed pixels with a 256-entry ARGB4444 palette.
pub fn decode_ci8_argb4444(
    width: u32,
    height: u32,
    data: &[u8],
    palette: &[u16; 256],
) -> Result<Bitmap> {
    check_dims(width, height, 1)?;
    let data = slice(data, 0, width as usize * height as usize)?;
    let pal: Vec<u32> = palette.iter().map(|&c| argb4444_to_argb32(c)).collect();
    let pixels = data.iter().map(|&i| pal[i as usize]).collect();
    Bitmap::from_argb32(width, height, pixels)
}

/// Linear 1bpp, most significant bit first. Set bits are `fg`, clear bits `bg`.
pub fn decode_mono(width: u32, height: u32, data: &[u8], fg: u32, bg: u32) -> Result<Bitmap> {
    check_dims(width, height, 8)?;
    let data = slice(data, 0, width as usize * height as usize / 8)?;
    let pixels = data
        .iter()
        .flat_map(|&b| (0..8).rev().map(move |bit| if b >> bit & 1 != 0 { fg } else { bg }))
        .collect();
    Bitmap::from_argb32(width, height, pixels)
}

/// Decode a PNG stream.
pub fn decode_png(data: &[u8]) -> Result<Bitmap> {
    let mut decoder = png::Decoder::new(Cursor::new(data));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder
        .read_info()
        .map_err(|_| Error::Parse("invalid PNG header"))?;

    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(Error::Parse("PNG dimensions out of range"));
    }

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let frame = reader
        .next_frame(&mut buf)
        .map_err(|_| Error::Parse("invalid PNG data"))?;

    let channels = match frame.color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => return Err(Error::Parse("unexpanded PNG palette")),
    };

    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        let row = slice(&buf, y as usize * frame.line_size, width as usize * channels)?;
        pixels.extend(row.chunks_exact(channels).map(|px| match *px {
            [l] => argb(0xFF, l as u32, l as u32, l as u32),
            [l, a] => argb(a as u32, l as u32, l as u32, l as u32),
            [r, g, b] => argb(0xFF, r as u32, g as u32, b as u32),
            [r, g, b, a] => argb(a as u32, r as u32, g as u32, b as u32),
            _ => 0,
        }));
    }
    Bitmap::from_argb32(width, height, pixels)
}
