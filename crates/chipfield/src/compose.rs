//! Composites layer descriptors into a single chip image.
//!
//! Geometry is recomputed from the live descriptor list on every call, since
//! the host may reconfigure descriptors between chip creations. Source images
//! are deep-cloned before placement so later descriptor mutation never bleeds
//! into chips already committed to the text.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::layer::{Gravity, LayerHandle, Margins};

/// A finished chip raster along with its dimensions.
#[derive(Debug, Clone)]
pub struct Composite {
    /// The combined raster.
    pub image: RgbaImage,
    /// Composite width in pixels.
    pub width: u32,
    /// Composite height in pixels.
    pub height: u32,
}

/// Size and placement inputs for one layer, snapshotted at composite time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    /// Intrinsic width.
    pub width: u32,
    /// Intrinsic height.
    pub height: u32,
    /// Anchor class.
    pub gravity: Gravity,
    /// Margin around the intrinsic size.
    pub margins: Margins,
}

/// Four-sided inset of a layer within the composite box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Inset {
    /// Pixels from the left edge.
    pub left: u32,
    /// Pixels from the top edge.
    pub top: u32,
    /// Pixels from the right edge.
    pub right: u32,
    /// Pixels from the bottom edge.
    pub bottom: u32,
}

/// Maximum margin-inclusive extent of all layers in one gravity class.
#[derive(Debug, Clone, Copy, Default)]
struct Extent {
    /// Widest margin-inclusive width seen.
    w: u32,
    /// Tallest margin-inclusive height seen.
    h: u32,
}

impl Extent {
    /// Grow the extent to cover a layer of the given margin-inclusive size.
    fn grow(&mut self, w: u32, h: u32) {
        self.w = self.w.max(w);
        self.h = self.h.max(h);
    }
}

/// Compute the composite box size and the per-layer insets.
///
/// The box width is the larger of the left+right+center extents and either
/// vertical extent, so top and bottom layers may span the full width while
/// left and right layers may span the full height.
pub(crate) fn layout(placements: &[Placement]) -> (u32, u32, Vec<Inset>) {
    let mut left = Extent::default();
    let mut top = Extent::default();
    let mut right = Extent::default();
    let mut bottom = Extent::default();
    let mut center = Extent::default();

    for p in placements {
        let w = p.width + p.margins.left + p.margins.right;
        let h = p.height + p.margins.top + p.margins.bottom;
        match p.gravity {
            Gravity::Left => left.grow(w, h),
            Gravity::Right => right.grow(w, h),
            Gravity::Top => top.grow(w, h),
            Gravity::Bottom => bottom.grow(w, h),
            Gravity::Center => center.grow(w, h),
        }
    }

    let width = (left.w + right.w + center.w).max(top.w).max(bottom.w);
    let height = (top.h + bottom.h + center.h).max(left.h).max(right.h);

    let insets = placements
        .iter()
        .map(|p| match p.gravity {
            Gravity::Left => {
                let side = (height - p.height) / 2;
                Inset {
                    left: p.margins.left,
                    top: side,
                    right: width - p.margins.left - p.width,
                    bottom: side,
                }
            }
            Gravity::Right => {
                let side = (height - p.height) / 2;
                Inset {
                    left: width - p.margins.right - p.width,
                    top: side,
                    right: p.margins.right,
                    bottom: side,
                }
            }
            Gravity::Top => {
                let side = (width - p.width) / 2;
                Inset {
                    left: side,
                    top: p.margins.top,
                    right: side,
                    bottom: height - p.margins.top - p.height,
                }
            }
            Gravity::Bottom => {
                let side = (width - p.width) / 2;
                Inset {
                    left: side,
                    top: height - p.margins.bottom - p.height,
                    right: side,
                    bottom: p.margins.bottom,
                }
            }
            Gravity::Center => {
                let ox = (width - left.w - right.w - center.w) / 2;
                let oy = (height - top.h - bottom.h - center.h) / 2;
                Inset {
                    left: left.w + ox,
                    top: top.h + oy,
                    right: right.w + ox,
                    bottom: bottom.h + oy,
                }
            }
        })
        .collect();

    (width, height, insets)
}

/// Blit a cloned copy of `source` into the box left by `inset`, stretching it
/// to the box when the intrinsic size differs.
fn place(canvas: &mut RgbaImage, source: &RgbaImage, inset: Inset, width: u32, height: u32) {
    let box_w = width.saturating_sub(inset.left + inset.right);
    let box_h = height.saturating_sub(inset.top + inset.bottom);
    if box_w == 0 || box_h == 0 {
        return;
    }
    let clone = if (box_w, box_h) == source.dimensions() {
        source.clone()
    } else {
        imageops::resize(source, box_w, box_h, FilterType::Triangle)
    };
    imageops::overlay(canvas, &clone, i64::from(inset.left), i64::from(inset.top));
}

/// Build one composite image from the live layer descriptors.
///
/// Layers without an image are skipped. Returns `None` when no layer carries
/// an image, in which case the caller falls back to plain text insertion. The
/// background, when present, is the bottom of the stack and stretches to the
/// full composite box.
pub fn compose(layers: &[LayerHandle], background: Option<&RgbaImage>) -> Option<Composite> {
    let live: Vec<&LayerHandle> = layers
        .iter()
        .filter(|handle| handle.borrow().image().is_some())
        .collect();
    if live.is_empty() {
        return None;
    }

    // Background occupies stack index zero when present.
    let base = usize::from(background.is_some());
    let mut placements = Vec::with_capacity(live.len());
    for (pos, handle) in live.iter().enumerate() {
        let mut layer = handle.borrow_mut();
        layer.idx = base + pos;
        placements.push(Placement {
            width: layer.width(),
            height: layer.height(),
            gravity: layer.gravity,
            margins: layer.margins,
        });
    }

    let (width, height, insets) = layout(&placements);
    let mut canvas = RgbaImage::new(width, height);

    if let Some(bg) = background {
        place(&mut canvas, bg, Inset::default(), width, height);
    }
    for (handle, inset) in live.iter().zip(insets) {
        let layer = handle.borrow();
        if let Some(img) = layer.image() {
            place(&mut canvas, img, inset, width, height);
        }
    }

    Some(Composite {
        image: canvas,
        width,
        height,
    })
}
