use std::time::{Duration, Instant};
use anyhow::{anyhow, Result};
use log::debug;
use minifb::{Key, Scale, Window, WindowOptions};
use crate::surface::{Framebuffer, Surface};
use crate::{rgb565, Geometry};

const FRAME_INTERVAL: Duration = Duration::from_micros(16_600);

/// Desktop window standing in for the physical panel.
///
/// Pixels land in the RGB565 framebuffer and the 0RGB window buffer at the
/// same time; the window itself is repainted at most once per frame interval
/// so that a fast scheduling loop does not spend its time in the compositor.
pub struct Canvas {
    window: Window,
    fb: Framebuffer,
    buffer: Vec<u32>,
    need_update: bool,
    last_update: Instant,
}

impl Canvas {
    pub fn new(geometry: Geometry, scale: u8) -> Result<Self> {
        let options = WindowOptions { scale: to_scale(scale)?, ..WindowOptions::default() };
        let mut window = Window::new(
            &format!("pixwire {}x{}", geometry.width, geometry.height),
            geometry.width as usize,
            geometry.height as usize,
            options,
        )
        .map_err(|e| anyhow!("Unable to create window: {}", e))?;
        window.limit_update_rate(None);
        Ok(Self {
            window,
            fb: Framebuffer::new(geometry),
            buffer: vec![0; geometry.area()],
            need_update: true,
            last_update: Instant::now(),
        })
    }
}

impl Surface for Canvas {
    fn geometry(&self) -> Geometry {
        self.fb.geometry()
    }

    fn set_pixel(&mut self, x: u16, y: u16, color: u16) {
        self.fb.set_pixel(x, y, color);
        let i = y as usize * self.fb.geometry().width as usize + x as usize;
        if let Some(px) = self.buffer.get_mut(i) {
            *px = rgb565::to_xrgb8888(color);
        }
        self.need_update = true;
    }

    fn clear(&mut self, color: u16) {
        self.fb.clear(color);
        self.buffer.fill(rgb565::to_xrgb8888(color));
        self.need_update = true;
    }

    fn flush(&mut self) -> Result<()> {
        if self.last_update.elapsed() < FRAME_INTERVAL {
            return Ok(());
        }
        let Geometry { width, height } = self.fb.geometry();
        if self.need_update {
            self.window
                .update_with_buffer(&self.buffer, width as usize, height as usize)
                .map_err(|e| anyhow!("Unable to update screen buffer: {}", e))?;
            self.need_update = false;
        } else {
            self.window.update();
        }
        self.last_update = Instant::now();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    fn snapshot(&self) -> &Framebuffer {
        &self.fb
    }
}

fn to_scale(scale: u8) -> Result<Scale> {
    debug!("window scale x{}", scale);
    Ok(match scale {
        1 => Scale::X1,
        2 => Scale::X2,
        4 => Scale::X4,
        8 => Scale::X8,
        _ => return Err(anyhow!("unsupported window scale {}, use 1, 2, 4 or 8", scale)),
    })
}
