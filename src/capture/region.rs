//! Pure region geometry and cropping — functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes pixel data in, returns pixel data out.

use super::DisplayBounds;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// A pointer position in overlay-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A normalized rectangle: `width` and `height` are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionSelection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RegionSelection {
    /// Rectangle spanned by two drag endpoints, whichever direction the
    /// drag went.
    pub fn from_drag(start: Point, end: Point) -> Self {
        Self {
            x: start.x.min(end.x),
            y: start.y.min(end.y),
            width: (start.x - end.x).abs(),
            height: (start.y - end.y).abs(),
        }
    }

    /// Flip negative extents so the rectangle covers the same area with
    /// non-negative width and height.
    pub fn normalized(self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Self { x, y, width, height }
    }

    /// Both sides strictly larger than `min_size`.
    pub fn exceeds(&self, min_size: f64) -> bool {
        self.width > min_size && self.height > min_size
    }

    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..self
        }
    }

    /// Map a desktop-global selection onto a snapshot of `display`.
    ///
    /// When the snapshot is larger than the display's logical bounds (HiDPI)
    /// the rectangle is scaled by the pixel ratio first. Each of x, y, width
    /// and height is then rounded to the nearest integer independently, and
    /// the result is clipped to the image.
    pub fn to_pixel_rect(
        &self,
        display: &DisplayBounds,
        image_width: u32,
        image_height: u32,
    ) -> Result<PixelRect, CropError> {
        if display.width == 0 || display.height == 0 {
            return Err(CropError::ZeroDimension);
        }
        let scale_x = image_width as f64 / display.width as f64;
        let scale_y = image_height as f64 / display.height as f64;
        let out_of_bounds = |requested| CropError::OutOfBounds {
            requested,
            image_size: (image_width, image_height),
        };

        let components = [self.x, self.y, self.width, self.height];
        if components.iter().any(|c| !c.is_finite()) {
            return Err(out_of_bounds((0, 0, 0, 0)));
        }

        // Float-to-int casts saturate, so every component fits in an i64.
        let x = ((self.x - display.x as f64) * scale_x).round() as i64;
        let y = ((self.y - display.y as f64) * scale_y).round() as i64;
        let width = (self.width * scale_x).round().max(0.0) as i64;
        let height = (self.height * scale_y).round().max(0.0) as i64;

        // Keep only the part of the rectangle that lies on the snapshot.
        let left = x.max(0);
        let top = y.max(0);
        let right = x.saturating_add(width).min(image_width as i64);
        let bottom = y.saturating_add(height).min(image_height as i64);

        if left >= image_width as i64 || top >= image_height as i64 || right <= 0 || bottom <= 0 {
            return Err(out_of_bounds((
                clamp_u32(x),
                clamp_u32(y),
                clamp_u32(width),
                clamp_u32(height),
            )));
        }

        Ok(PixelRect {
            x: left as u32,
            y: top as u32,
            width: (right - left).max(0) as u32,
            height: (bottom - top).max(0) as u32,
        })
    }
}

fn clamp_u32(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

/// Integer crop rectangle in snapshot pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Crops a `DynamicImage` to the specified rectangle and returns PNG bytes.
///
/// This is a pure function with no side effects.
pub fn crop_to_png_bytes(image: &DynamicImage, rect: PixelRect) -> Result<Vec<u8>, CropError> {
    let PixelRect {
        x,
        y,
        width,
        height,
    } = rect;

    if width == 0 || height == 0 {
        return Err(CropError::ZeroDimension);
    }

    let (img_width, img_height) = (image.width(), image.height());

    let exceeds = |start: u32, len: u32, limit: u32| start as u64 + len as u64 > limit as u64;
    if exceeds(x, width, img_width) || exceeds(y, height, img_height) {
        return Err(CropError::OutOfBounds {
            requested: (x, y, width, height),
            image_size: (img_width, img_height),
        });
    }

    let cropped = image.crop_imm(x, y, width, height);
    encode_png(&cropped)
}

/// PNG-encode a whole image.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, CropError> {
    let mut png_bytes: Vec<u8> = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .map_err(|e| CropError::EncodingFailed(e.to_string()))?;
    Ok(png_bytes)
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error(
        "Crop rectangle ({},{},{},{}) exceeds image bounds ({}x{})",
        requested.0, requested.1, requested.2, requested.3,
        image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: (u32, u32, u32, u32),
        image_size: (u32, u32),
    },

    #[error("PNG encoding failed: {0}")]
    EncodingFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};

    fn display(width: u32, height: u32) -> DisplayBounds {
        DisplayBounds {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    #[test]
    fn drag_direction_does_not_matter() {
        let backwards = RegionSelection::from_drag(Point::new(50.0, 50.0), Point::new(10.0, 10.0));
        let forwards = RegionSelection::from_drag(Point::new(10.0, 10.0), Point::new(50.0, 50.0));
        let expected = RegionSelection {
            x: 10.0,
            y: 10.0,
            width: 40.0,
            height: 40.0,
        };
        assert_eq!(backwards, expected);
        assert_eq!(forwards, expected);
    }

    #[test]
    fn normalized_flips_negative_extents() {
        let region = RegionSelection {
            x: 100.0,
            y: 100.0,
            width: -30.0,
            height: 20.0,
        }
        .normalized();
        assert_eq!(region.x, 70.0);
        assert_eq!(region.width, 30.0);
        assert_eq!(region.height, 20.0);
    }

    #[test]
    fn size_gate_is_strict() {
        let region = |w, h| RegionSelection {
            x: 0.0,
            y: 0.0,
            width: w,
            height: h,
        };
        assert!(!region(5.0, 200.0).exceeds(10.0));
        assert!(!region(10.0, 10.0).exceeds(10.0));
        assert!(region(10.5, 11.0).exceeds(10.0));
    }

    #[test]
    fn pixel_rect_rounds_each_component() {
        let region = RegionSelection {
            x: 10.4,
            y: 10.6,
            width: 20.5,
            height: 19.4,
        };
        let rect = region.to_pixel_rect(&display(100, 100), 100, 100).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 10,
                y: 11,
                width: 21,
                height: 19
            }
        );
    }

    #[test]
    fn pixel_rect_scales_for_hidpi_snapshots() {
        let region = RegionSelection {
            x: 100.0,
            y: 50.0,
            width: 200.0,
            height: 300.0,
        };
        let rect = region.to_pixel_rect(&display(800, 600), 1600, 1200).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 200,
                y: 100,
                width: 400,
                height: 600
            }
        );
    }

    #[test]
    fn pixel_rect_is_relative_to_display_origin() {
        let bounds = DisplayBounds {
            x: -1920,
            y: 0,
            width: 1920,
            height: 1080,
        };
        let region = RegionSelection {
            x: -1900.0,
            y: 20.0,
            width: 100.0,
            height: 100.0,
        };
        let rect = region.to_pixel_rect(&bounds, 1920, 1080).unwrap();
        assert_eq!((rect.x, rect.y), (20, 20));
    }

    #[test]
    fn pixel_rect_clips_to_image() {
        let region = RegionSelection {
            x: 90.0,
            y: 90.0,
            width: 50.0,
            height: 50.0,
        };
        let rect = region.to_pixel_rect(&display(100, 100), 100, 100).unwrap();
        assert_eq!((rect.width, rect.height), (10, 10));

        let hanging_left = RegionSelection {
            x: -20.0,
            y: 0.0,
            width: 50.0,
            height: 40.0,
        };
        let rect = hanging_left
            .to_pixel_rect(&display(100, 100), 100, 100)
            .unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 0,
                y: 0,
                width: 30,
                height: 40
            }
        );
    }

    #[test]
    fn pixel_rect_rejects_huge_and_non_finite_regions() {
        let bounds = display(800, 600);
        let huge = RegionSelection {
            x: 1e19,
            y: 0.0,
            width: 1e19,
            height: 50.0,
        };
        assert!(matches!(
            huge.to_pixel_rect(&bounds, 800, 600),
            Err(CropError::OutOfBounds { .. })
        ));

        let far_left = RegionSelection {
            x: -1e19,
            y: 0.0,
            width: 1e19,
            height: 50.0,
        };
        assert!(matches!(
            far_left.to_pixel_rect(&bounds, 800, 600),
            Err(CropError::OutOfBounds { .. })
        ));

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let region = RegionSelection {
                x: 10.0,
                y: bad,
                width: 100.0,
                height: 100.0,
            };
            assert!(matches!(
                region.to_pixel_rect(&bounds, 800, 600),
                Err(CropError::OutOfBounds { .. })
            ));
        }
    }

    #[test]
    fn crop_valid_region() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(100, 100));
        let rect = PixelRect {
            x: 10,
            y: 10,
            width: 50,
            height: 50,
        };
        let bytes = crop_to_png_bytes(&img, rect).unwrap();
        // PNG magic bytes
        assert_eq!(&bytes[..4], &[0x89, 0x50, 0x4E, 0x47]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (50, 50));
    }

    #[test]
    fn crop_zero_dimension_fails() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(100, 100));
        let rect = PixelRect {
            x: 0,
            y: 0,
            width: 0,
            height: 50,
        };
        assert!(matches!(
            crop_to_png_bytes(&img, rect),
            Err(CropError::ZeroDimension)
        ));
    }

    #[test]
    fn crop_out_of_bounds_fails() {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(100, 100));
        let rect = PixelRect {
            x: 80,
            y: 80,
            width: 30,
            height: 30,
        };
        assert!(matches!(
            crop_to_png_bytes(&img, rect),
            Err(CropError::OutOfBounds { .. })
        ));

        let wrapping = PixelRect {
            x: 10,
            y: 0,
            width: u32::MAX,
            height: 10,
        };
        assert!(matches!(
            crop_to_png_bytes(&img, wrapping),
            Err(CropError::OutOfBounds { .. })
        ));
    }
}
