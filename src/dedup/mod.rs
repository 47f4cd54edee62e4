//! Deduplication of 2D boxes within one image.
//!
//! Boxes come from projected cuboids (ordered by depth) or from 2D
//! annotations (ordered by area). After slivers are dropped, a box is
//! removed when too much of it is covered by a box that comes later in that
//! order, i.e. a nearer or larger one.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ConversionConfig;
use crate::geometry::PixelBox;

/// An image-plane box with its class label and optional track id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Box2d {
    pub bbox: PixelBox,
    pub label: String,
    pub track_id: Option<u32>,
}

/// A [`Box2d`] paired with the camera depth of the cuboid it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthBox {
    pub box2d: Box2d,
    pub depth: f64,
}

/// Anything that covers a region of the image.
pub trait HasPixelBox {
    fn pixel_box(&self) -> &PixelBox;
}

impl HasPixelBox for PixelBox {
    fn pixel_box(&self) -> &PixelBox {
        self
    }
}

impl HasPixelBox for Box2d {
    fn pixel_box(&self) -> &PixelBox {
        &self.bbox
    }
}

impl HasPixelBox for DepthBox {
    fn pixel_box(&self) -> &PixelBox {
        &self.box2d.bbox
    }
}

/// Fraction of `a` covered by `b`, counting pixels inclusively.
///
/// Not symmetric. Returns 0 for a box with no area.
pub fn overlap_ratio(a: &PixelBox, b: &PixelBox) -> f64 {
    let area = a.inclusive_area();
    if area <= 0 {
        return 0.0;
    }
    a.inclusive_overlap(b) as f64 / area as f64
}

/// Drops boxes carrying negative coordinates, which includes [`PixelBox::SENTINEL`].
pub fn remove_unprojected<T: HasPixelBox>(boxes: Vec<T>) -> Vec<T> {
    boxes
        .into_iter()
        .filter(|item| {
            let bbox = item.pixel_box();
            bbox.left >= 0 && bbox.top >= 0 && bbox.right >= 0 && bbox.bottom >= 0
        })
        .collect()
}

/// Drops boxes with zero height or a width/height ratio below `min_aspect_ratio`.
pub fn remove_slivers<T: HasPixelBox>(boxes: Vec<T>, min_aspect_ratio: f64) -> Vec<T> {
    boxes
        .into_iter()
        .filter(|item| {
            let bbox = item.pixel_box();
            let height = bbox.height();
            height != 0 && (bbox.width() as f64 / height as f64) >= min_aspect_ratio
        })
        .collect()
}

/// Removes every box whose covered fraction by any later box exceeds `threshold`.
///
/// The order of `boxes` is the occlusion order: later boxes hide earlier ones.
fn remove_covered<T: HasPixelBox>(boxes: Vec<T>, threshold: f64) -> Vec<T> {
    let mut covered = vec![false; boxes.len()];
    for (i, flag) in covered.iter_mut().enumerate() {
        let current = boxes[i].pixel_box();
        if boxes[i + 1..]
            .iter()
            .any(|later| overlap_ratio(current, later.pixel_box()) > threshold)
        {
            *flag = true;
        }
    }

    boxes
        .into_iter()
        .zip(covered)
        .filter_map(|(item, is_covered)| (!is_covered).then_some(item))
        .collect()
}

/// Orders boxes farthest first and removes the ones hidden behind nearer boxes.
///
/// Boxes at equal depth keep their input order.
pub fn remove_occluded(mut boxes: Vec<DepthBox>, threshold: f64) -> Vec<DepthBox> {
    boxes.sort_by(|a, b| b.depth.total_cmp(&a.depth));
    remove_covered(boxes, threshold)
}

/// Orders boxes by ascending area and removes the ones mostly inside larger boxes.
pub fn remove_occluded_by_area(mut boxes: Vec<Box2d>, threshold: f64) -> Vec<Box2d> {
    boxes.sort_by_key(|item| item.bbox.width() as i64 * item.bbox.height() as i64);
    remove_covered(boxes, threshold)
}

/// Per-image box filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxFilter {
    /// Covered fraction above which a box is dropped.
    pub occlusion_threshold: f64,
    /// Minimum width/height ratio; thinner boxes are dropped.
    pub min_aspect_ratio: f64,
}

impl BoxFilter {
    pub fn new(occlusion_threshold: f64, min_aspect_ratio: f64) -> Self {
        BoxFilter {
            occlusion_threshold,
            min_aspect_ratio,
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        BoxFilter::new(config.occlusion_threshold, config.min_aspect_ratio)
    }

    /// Filters boxes projected from cuboids, farthest first.
    pub fn apply(&self, boxes: Vec<DepthBox>) -> Vec<Box2d> {
        let total = boxes.len();
        let boxes = remove_unprojected(boxes);
        let projected = boxes.len();
        let boxes = remove_slivers(boxes, self.min_aspect_ratio);
        let kept_slivers = boxes.len();
        let boxes = remove_occluded(boxes, self.occlusion_threshold);
        debug!(
            "Box filter: {} in, {} unprojected, {} slivers, {} occluded, {} kept",
            total,
            total - projected,
            projected - kept_slivers,
            kept_slivers - boxes.len(),
            boxes.len()
        );
        boxes.into_iter().map(|item| item.box2d).collect()
    }

    /// Filters boxes taken directly from 2D annotations, smallest first.
    pub fn apply_by_area(&self, boxes: Vec<Box2d>) -> Vec<Box2d> {
        let total = boxes.len();
        let boxes = remove_slivers(boxes, self.min_aspect_ratio);
        let kept_slivers = boxes.len();
        let boxes = remove_occluded_by_area(boxes, self.occlusion_threshold);
        debug!(
            "Box filter by area: {} in, {} slivers, {} occluded, {} kept",
            total,
            total - kept_slivers,
            kept_slivers - boxes.len(),
            boxes.len()
        );
        boxes
    }
}

impl Default for BoxFilter {
    fn default() -> Self {
        BoxFilter::from_config(&ConversionConfig::default())
    }
}
