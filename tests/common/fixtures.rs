use std::io::Cursor;
use std::path::Path;

use image::{ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use routegrader::config::GraderConfig;
use routegrader::models::{BoundingBox, ColorClass, Contour, Hold, HoldType};

/// Wall surface color used by all fixtures; dark so colored holds binarize.
pub const WALL: [u8; 3] = [10, 10, 10];
/// Exact palette red/blue so classification margins stay comfortable.
pub const RED: [u8; 3] = [220, 40, 40];
pub const BLUE: [u8; 3] = [50, 80, 230];
/// Deliberately far from every palette entry, but bright enough to detect.
pub const OLIVE: [u8; 3] = [120, 120, 20];

/// Draws a synthetic wall photo: filled circles on a dark background.
pub fn wall_image(width: u32, height: u32, holds: &[(i32, i32, i32, [u8; 3])]) -> RgbImage {
    let mut img = ImageBuffer::from_pixel(width, height, Rgb(WALL));
    for &(cx, cy, radius, color) in holds {
        draw_filled_circle_mut(&mut img, (cx, cy), radius, Rgb(color));
    }
    img
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("failed to encode fixture image");
    buf.into_inner()
}

/// Config rooted in a temp directory so tests leave no trace behind.
pub fn test_config(dir: &Path) -> GraderConfig {
    GraderConfig {
        image_dir: dir.join("images"),
        history_db: dir.join("history.db"),
        ..GraderConfig::default()
    }
}

/// A square contour: ring of boundary pixels plus a caller-chosen enclosed
/// area, which lets tests dial convexity directly.
pub fn square_contour(x0: u32, y0: u32, size: u32, area_px: u32, color: [u8; 3]) -> Contour {
    let mut boundary = Vec::new();
    for i in 0..size {
        boundary.push((x0 + i, y0));
        boundary.push((x0 + i, y0 + size - 1));
        boundary.push((x0, y0 + i));
        boundary.push((x0 + size - 1, y0 + i));
    }
    Contour {
        boundary,
        bbox: BoundingBox {
            min_x: x0,
            min_y: y0,
            max_x: x0 + size - 1,
            max_y: y0 + size - 1,
        },
        area_px,
        mean_color: color,
    }
}

/// Rectangular ring contour, for axis-angle tests.
pub fn rect_contour(x0: u32, y0: u32, w: u32, h: u32, color: [u8; 3]) -> Contour {
    let mut boundary = Vec::new();
    for i in 0..w {
        boundary.push((x0 + i, y0));
        boundary.push((x0 + i, y0 + h - 1));
    }
    for j in 0..h {
        boundary.push((x0, y0 + j));
        boundary.push((x0 + w - 1, y0 + j));
    }
    Contour {
        boundary,
        bbox: BoundingBox {
            min_x: x0,
            min_y: y0,
            max_x: x0 + w - 1,
            max_y: y0 + h - 1,
        },
        area_px: w * h,
        mean_color: color,
    }
}

/// Hold with a given score, class and vertical extent; the shape fields are
/// neutral filler.
pub fn make_hold(score: f32, color: ColorClass, min_y: u32, max_y: u32) -> Hold {
    Hold {
        bbox: BoundingBox {
            min_x: 100,
            min_y,
            max_x: 140,
            max_y,
        },
        area_px: 1_000,
        color,
        hold_type: HoldType::Handhold,
        score,
        convexity: 0.9,
        axis_angle_deg: 10.0,
        circularity: 0.8,
        aspect_ratio: 1.0,
    }
}

/// Position of a bucket label on the configured scale; panics on labels the
/// scale does not contain.
pub fn bucket_rank(config: &GraderConfig, label: &str) -> usize {
    config
        .buckets
        .iter()
        .position(|b| b.label == label)
        .unwrap_or_else(|| panic!("bucket {label:?} not on the configured scale"))
}
