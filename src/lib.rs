pub mod canvas;
pub mod config;
pub mod decoder;
pub mod server;
pub mod session;
pub mod sink;
pub mod stats;
pub mod surface;
pub mod util;

#[cfg(target_os = "linux")]
pub mod fbdev;

#[cfg(test)]
pub(crate) mod testing;

use std::io::{Read, Write};
use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

/* ============================== Core Types ============================== */

/// Size of one record on the wire: `[x][y][color lo][color hi]`.
pub const RECORD_LEN: usize = 4;

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_WIDTH: u16 = 320;
pub const DEFAULT_HEIGHT: u16 = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u16,
    pub height: u16,
}

impl Geometry {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// A single decoded record: one RGB565 pixel at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelUpdate {
    pub x: u8,
    pub y: u8,
    pub color: u16,
}

impl PixelUpdate {
    pub fn new(x: u8, y: u8, color: u16) -> Self {
        Self { x, y, color }
    }

    pub fn from_bytes(bytes: &[u8; RECORD_LEN]) -> Self {
        Self {
            x: bytes[0],
            y: bytes[1],
            color: LittleEndian::read_u16(&bytes[2..]),
        }
    }

    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut bytes = [self.x, self.y, 0, 0];
        LittleEndian::write_u16(&mut bytes[2..], self.color);
        bytes
    }
}

/* ========================= Blocking stream helpers ====================== */

/// Blocking codec for peers and tools talking to the receiver.
/// The receiver itself decodes through [`decoder::RecordReader`].
pub trait Message: Sized {
    fn read_from<R: Read>(reader: &mut R) -> Result<Self>;
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()>;
}

impl Message for PixelUpdate {
    fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let x = reader.read_u8()?;
        let y = reader.read_u8()?;
        let color = reader.read_u16::<LittleEndian>()?;
        Ok(Self { x, y, color })
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(self.x)?;
        writer.write_u8(self.y)?;
        writer.write_u16::<LittleEndian>(self.color)?;
        Ok(())
    }
}

/* ================================ RGB565 ================================ */

pub mod rgb565 {
    pub const BLACK: u16 = 0x0000;
    pub const WHITE: u16 = 0xFFFF;
    pub const RED: u16 = 0xF800;
    pub const GREEN: u16 = 0x07E0;
    pub const BLUE: u16 = 0x001F;

    /// Expand to 8-bit channels, replicating the high bits into the low ones
    /// so that full intensity maps to 0xFF.
    pub fn to_rgb888(color: u16) -> (u8, u8, u8) {
        let r = ((color >> 11) & 0x1F) as u8;
        let g = ((color >> 5) & 0x3F) as u8;
        let b = (color & 0x1F) as u8;
        ((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
    }

    /// 0RGB word as expected by minifb and 32 bpp framebuffers.
    pub fn to_xrgb8888(color: u16) -> u32 {
        let (r, g, b) = to_rgb888(color);
        ((r as u32) << 16) | ((g as u32) << 8) | b as u32
    }

    pub fn from_rgb888(r: u8, g: u8, b: u8) -> u16 {
        ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
    }
}
