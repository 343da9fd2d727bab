use std::collections::HashMap;

use image::{GrayImage, Luma, RgbImage};
use imageproc::region_labelling::{Connectivity, connected_components};

use crate::models::{BoundingBox, Contour};

/// Per-label accumulator while scanning the labelled image.
struct Region {
    bbox: BoundingBox,
    pixel_count: u32,
    color_sum: [u64; 3],
    boundary: Vec<(u32, u32)>,
}

impl Region {
    fn absorb(&mut self, other: Region) {
        self.bbox = self.bbox.union(&other.bbox);
        self.pixel_count += other.pixel_count;
        for c in 0..3 {
            self.color_sum[c] += other.color_sum[c];
        }
        self.boundary.extend(other.boundary);
    }

    fn into_contour(self) -> Contour {
        let n = self.pixel_count.max(1) as u64;
        Contour {
            boundary: self.boundary,
            bbox: self.bbox,
            area_px: self.pixel_count,
            mean_color: [
                (self.color_sum[0] / n) as u8,
                (self.color_sum[1] / n) as u8,
                (self.color_sum[2] / n) as u8,
            ],
        }
    }
}

/// Find hold-candidate regions in a binary mask using connected components.
///
/// The color sample for each region is averaged over the matching pixels of
/// `source`, not the mask. Overlapping regions are merged by union before the
/// caller applies its area/skew filters, so a hold split by detection noise
/// is counted once.
pub fn find_regions(mask: &GrayImage, source: &RgbImage) -> Vec<Contour> {
    let labeled = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let (width, height) = labeled.dimensions();

    let mut regions: HashMap<u32, Region> = HashMap::new();

    for (x, y, label) in labeled.enumerate_pixels() {
        let label_val = label[0];
        if label_val == 0 {
            continue; // background
        }

        // A pixel is on the boundary when any 4-neighbor leaves the region.
        let mut on_boundary = x == 0 || y == 0 || x == width - 1 || y == height - 1;
        if !on_boundary {
            on_boundary = labeled.get_pixel(x - 1, y)[0] != label_val
                || labeled.get_pixel(x + 1, y)[0] != label_val
                || labeled.get_pixel(x, y - 1)[0] != label_val
                || labeled.get_pixel(x, y + 1)[0] != label_val;
        }

        let rgb = source.get_pixel(x, y).0;
        let region = regions.entry(label_val).or_insert_with(|| Region {
            bbox: BoundingBox {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            },
            pixel_count: 0,
            color_sum: [0; 3],
            boundary: Vec::new(),
        });

        region.bbox.min_x = region.bbox.min_x.min(x);
        region.bbox.min_y = region.bbox.min_y.min(y);
        region.bbox.max_x = region.bbox.max_x.max(x);
        region.bbox.max_y = region.bbox.max_y.max(y);
        region.pixel_count += 1;
        for c in 0..3 {
            region.color_sum[c] += rgb[c] as u64;
        }
        if on_boundary {
            region.boundary.push((x, y));
        }
    }

    merge_overlapping(regions.into_values().collect())
        .into_iter()
        .map(Region::into_contour)
        .collect()
}

/// Merge regions whose bounding boxes overlap until none do.
fn merge_overlapping(mut regions: Vec<Region>) -> Vec<Region> {
    loop {
        let before = regions.len();
        let mut merged: Vec<Region> = Vec::with_capacity(before);

        'next: for region in regions {
            for existing in &mut merged {
                if existing.bbox.overlaps(&region.bbox) {
                    existing.absorb(region);
                    continue 'next;
                }
            }
            merged.push(region);
        }

        if merged.len() == before {
            return merged;
        }
        regions = merged;
    }
}
