use std::path::Path;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use crate::{rgb565, Geometry};

/// The addressable pixel grid a [`crate::sink::DisplaySink`] draws on.
///
/// Callers bounds-check before `set_pixel`; implementations may assume
/// `geometry().contains(x, y)`.
pub trait Surface {
    fn geometry(&self) -> Geometry;

    fn set_pixel(&mut self, x: u16, y: u16, color: u16);

    fn clear(&mut self, color: u16);

    /// Push pending writes to the device. Called once per scheduling tick.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// False once the user has closed the output (window backends).
    fn is_open(&self) -> bool {
        true
    }

    fn snapshot(&self) -> &Framebuffer;
}

/// Plain RGB565 pixel store. Used directly as the headless backend and as
/// the shadow copy behind the window and fbdev backends.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    geometry: Geometry,
    pixels: Vec<u16>,
}

impl Framebuffer {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            pixels: vec![rgb565::BLACK; geometry.area()],
        }
    }

    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if !self.geometry.contains(x, y) {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    pub fn pixels(&self) -> &[u16] {
        &self.pixels
    }

    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.geometry.width as u32, self.geometry.height as u32, |x, y| {
            let (r, g, b) = rgb565::to_rgb888(self.pixels[self.index(x as u16, y as u16)]);
            Rgb([r, g, b])
        })
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.to_image()
            .save(path)
            .with_context(|| format!("could not write snapshot to {}", path.display()))
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.geometry.width as usize + x as usize
    }
}

impl Surface for Framebuffer {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: u16) {
        let i = self.index(x, y);
        if let Some(px) = self.pixels.get_mut(i) {
            *px = color;
        }
    }

    fn clear(&mut self, color: u16) {
        self.pixels.fill(color);
    }

    fn snapshot(&self) -> &Framebuffer {
        self
    }
}
