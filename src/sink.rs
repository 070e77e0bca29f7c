use anyhow::Result;
use log::{debug, trace};
use crate::stats::Stats;
use crate::surface::Surface;
use crate::PixelUpdate;

/// Sole writer of the display surface.
pub struct DisplaySink<S: Surface> {
    surface: S,
}

impl<S: Surface> DisplaySink<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    /// Draw `update` if it lies on the surface, otherwise count it as dropped.
    /// Returns whether the pixel was written.
    pub fn apply(&mut self, update: PixelUpdate, stats: &mut Stats) -> bool {
        let (x, y) = (update.x as u16, update.y as u16);
        if !self.surface.geometry().contains(x, y) {
            debug!("dropping out-of-range update ({},{})", x, y);
            stats.dropped += 1;
            return false;
        }
        trace!("pixel ({},{}) = {:#06x}", x, y, update.color);
        self.surface.set_pixel(x, y, update.color);
        stats.applied += 1;
        true
    }

    pub fn clear(&mut self, color: u16) {
        self.surface.clear(color);
    }

    pub fn flush(&mut self) -> Result<()> {
        self.surface.flush()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Framebuffer;
    use crate::testing::RecordingSurface;
    use crate::Geometry;

    #[test]
    fn applies_in_bounds_update_once() {
        let mut sink = DisplaySink::new(RecordingSurface::new(Geometry::new(320, 240)));
        let mut stats = Stats::default();
        assert!(sink.apply(PixelUpdate::new(10, 5, 0x07E0), &mut stats));
        assert_eq!(sink.surface().writes, vec![(10, 5, 0x07E0)]);
        assert_eq!(stats.applied, 1);
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn x_255_fits_a_320_wide_display() {
        let mut sink = DisplaySink::new(RecordingSurface::new(Geometry::new(320, 240)));
        let mut stats = Stats::default();
        assert!(sink.apply(PixelUpdate::from_bytes(&[0xFF, 0x00, 0x00, 0x00]), &mut stats));
        assert_eq!(sink.surface().writes, vec![(255, 0, 0x0000)]);
    }

    #[test]
    fn out_of_range_is_dropped_and_counted() {
        let mut sink = DisplaySink::new(RecordingSurface::new(Geometry::new(128, 64)));
        let mut stats = Stats::default();
        for (x, y) in [(128u8, 0u8), (0, 64), (200, 200)] {
            let before = stats.dropped;
            assert!(!sink.apply(PixelUpdate::new(x, y, 0xFFFF), &mut stats));
            assert_eq!(stats.dropped, before + 1);
        }
        assert!(sink.surface().writes.is_empty());
        assert_eq!(stats.applied, 0);
    }

    #[test]
    fn repeated_update_leaves_same_pixel() {
        let mut sink = DisplaySink::new(Framebuffer::new(Geometry::new(16, 16)));
        let mut stats = Stats::default();
        let update = PixelUpdate::new(3, 4, 0xF800);
        sink.apply(update, &mut stats);
        let once = sink.surface().pixels().to_vec();
        for _ in 0..5 {
            sink.apply(update, &mut stats);
        }
        assert_eq!(sink.surface().pixels(), &once[..]);
        assert_eq!(sink.surface().pixel(3, 4), Some(0xF800));
    }
}
