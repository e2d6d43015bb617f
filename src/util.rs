use geo::Coord;
use image::DynamicImage;

/// Mapping from on-screen display coordinates to native page-render
/// coordinates. Overlays are usually shown downscaled, so every click has to
/// be multiplied back up before it can set a layout boundary.
#[derive(Debug, Clone, Copy)]
pub struct DisplayScale {
    pub factor: f32,
}

impl DisplayScale {
    pub fn new(native_width: u32, display_width: f32) -> Self {
        Self {
            factor: native_width as f32 / display_width,
        }
    }

    pub fn to_render_space(&self, point: Coord<f32>) -> Coord<f32> {
        Coord {
            x: point.x * self.factor,
            y: point.y * self.factor,
        }
    }
}

pub(crate) fn crop_region(image: &DynamicImage, x0: f32, y0: f32, x1: f32, y1: f32) -> DynamicImage {
    let x = x0.clamp(0.0, image.width() as f32) as u32;
    let y = y0.clamp(0.0, image.height() as f32) as u32;
    // negative-size regions clamp to zero area instead of crashing
    let width = ((x1 - x0).max(0.0) as u32).min(image.width() - x);
    let height = ((y1 - y0).max(0.0) as u32).min(image.height() - y);
    log::trace!("cropping region at ({x}, {y}) size {width}x{height}");
    image.crop_imm(x, y, width, height)
}
