//! Layer descriptors that declare how a chip's composite image is built.

use std::cell::RefCell;
use std::rc::Rc;

use image::RgbaImage;

/// Anchor class controlling where a layer sits within the composite box.
///
/// `Left` and `Right` layers are vertically centered and anchored to their
/// horizontal margin. `Top` and `Bottom` layers are horizontally centered and
/// anchored to their vertical margin. `Center` layers sit between the left
/// and right extents horizontally and between the top and bottom extents
/// vertically.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub enum Gravity {
    /// Centered between the side extents on both axes.
    #[default]
    Center,
    /// Anchored to the left edge.
    Left,
    /// Anchored to the top edge.
    Top,
    /// Anchored to the right edge.
    Right,
    /// Anchored to the bottom edge.
    Bottom,
}

/// Four-sided margin around a layer's intrinsic size.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default)]
pub struct Margins {
    /// Left margin in pixels.
    pub left: u32,
    /// Top margin in pixels.
    pub top: u32,
    /// Right margin in pixels.
    pub right: u32,
    /// Bottom margin in pixels.
    pub bottom: u32,
}

impl Margins {
    /// Construct margins from the four sides.
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The same margin on all four sides.
    pub fn uniform(value: u32) -> Self {
        Self::new(value, value, value, value)
    }
}

/// One visual layer contributing to a chip's composite image.
///
/// A layer without an image is skipped at composite time. Descriptors are
/// mutable in place, so the host can swap the image on an existing layer to
/// change chips created from then on without touching chips already in the
/// text.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    /// Image placed by this layer, if any.
    image: Option<RgbaImage>,
    /// Intrinsic width, derived from the image.
    width: u32,
    /// Intrinsic height, derived from the image.
    height: u32,
    /// Anchor class within the composite box.
    pub gravity: Gravity,
    /// Margin around the intrinsic size.
    pub margins: Margins,
    /// Stack index assigned during the most recent composite.
    pub(crate) idx: usize,
}

impl Layer {
    /// Set the layer image. Intrinsic width and height follow the image.
    pub fn set_image(&mut self, image: RgbaImage) -> &mut Self {
        self.width = image.width();
        self.height = image.height();
        self.image = Some(image);
        self
    }

    /// Clear the layer image, excluding the layer from future composites.
    pub fn clear_image(&mut self) -> &mut Self {
        self.image = None;
        self.width = 0;
        self.height = 0;
        self
    }

    /// Set the anchor class.
    pub fn set_gravity(&mut self, gravity: Gravity) -> &mut Self {
        self.gravity = gravity;
        self
    }

    /// Set all four margins.
    pub fn set_margins(&mut self, left: u32, top: u32, right: u32, bottom: u32) -> &mut Self {
        self.margins = Margins::new(left, top, right, bottom);
        self
    }

    /// The current layer image, if any.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Intrinsic width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Intrinsic height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Shared handle to a layer descriptor.
///
/// The field owns the descriptor list, but handles are handed back to the
/// host so descriptors can be reconfigured between chip creations. Handles
/// are compared by identity when destroying a layer.
pub type LayerHandle = Rc<RefCell<Layer>>;
