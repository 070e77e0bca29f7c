use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};
use crate::surface::{Framebuffer, Surface};
use crate::{rgb565, Geometry};

/// Layout of a Linux framebuffer device as reported by sysfs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FbInfo {
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u8,
    /// Bytes per line.
    pub stride: usize,
}

impl FbInfo {
    /// Reads `virtual_size`, `bits_per_pixel` and `stride` from
    /// `/sys/class/graphics/<name>`.
    pub fn from_sysfs(dir: &Path) -> Result<Self> {
        let read = |name: &str| -> Result<String> {
            let path = dir.join(name);
            fs::read_to_string(&path)
                .map(|s| s.trim().to_string())
                .with_context(|| format!("could not read {}", path.display()))
        };
        let size = read("virtual_size")?;
        let (w, h) = size
            .split_once(',')
            .ok_or_else(|| anyhow!("malformed virtual_size: {}", size))?;
        let info = Self {
            width: w.trim().parse()?,
            height: h.trim().parse()?,
            bits_per_pixel: read("bits_per_pixel")?.parse()?,
            stride: read("stride")?.parse()?,
        };
        if info.bits_per_pixel != 16 && info.bits_per_pixel != 32 {
            bail!("unsupported framebuffer depth {} bpp", info.bits_per_pixel);
        }
        Ok(info)
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bits_per_pixel as usize / 8
    }

    fn offset(&self, x: u16, y: u16) -> u64 {
        (y as usize * self.stride + x as usize * self.bytes_per_pixel()) as u64
    }
}

/// Writes straight to `/dev/fbN`, one positional write per pixel.
pub struct FbDev {
    file: File,
    info: FbInfo,
    fb: Framebuffer,
    write_errors: u64,
}

impl FbDev {
    pub fn open(device: &Path, requested: Geometry) -> Result<Self> {
        let name = device
            .file_name()
            .ok_or_else(|| anyhow!("bad framebuffer path {}", device.display()))?;
        let info = FbInfo::from_sysfs(&PathBuf::from("/sys/class/graphics").join(name))?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .with_context(|| format!("could not open {}", device.display()))?;
        Ok(Self::with_file(file, info, requested))
    }

    pub fn with_file(file: File, info: FbInfo, requested: Geometry) -> Self {
        let geometry = Geometry::new(requested.width.min(info.width), requested.height.min(info.height));
        info!(
            "framebuffer {}x{} {}bpp, drawing {}x{}",
            info.width, info.height, info.bits_per_pixel, geometry.width, geometry.height
        );
        Self { file, info, fb: Framebuffer::new(geometry), write_errors: 0 }
    }

    fn encode(&self, color: u16) -> ([u8; 4], usize) {
        match self.info.bits_per_pixel {
            16 => {
                let [lo, hi] = color.to_le_bytes();
                ([lo, hi, 0, 0], 2)
            }
            _ => ((rgb565::to_xrgb8888(color) | 0xFF00_0000).to_le_bytes(), 4),
        }
    }

    fn write_at(&mut self, bytes: &[u8], offset: u64) {
        if let Err(e) = self.file.write_all_at(bytes, offset) {
            if self.write_errors == 0 {
                warn!("framebuffer write failed: {}", e);
            }
            self.write_errors += 1;
        }
    }
}

impl Surface for FbDev {
    fn geometry(&self) -> Geometry {
        self.fb.geometry()
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: u16) {
        self.fb.set_pixel(x, y, color);
        let (bytes, n) = self.encode(color);
        let offset = self.info.offset(x, y);
        self.write_at(&bytes[..n], offset);
    }

    fn clear(&mut self, color: u16) {
        self.fb.clear(color);
        let (bytes, n) = self.encode(color);
        let row: Vec<u8> = bytes[..n].iter().copied().cycle().take(self.fb.geometry().width as usize * n).collect();
        for y in 0..self.fb.geometry().height {
            let offset = self.info.offset(0, y);
            self.write_at(&row, offset);
        }
    }

    fn snapshot(&self) -> &Framebuffer {
        &self.fb
    }
}
