//! Bookkeeping for committed chips and the single pending chip.

use std::rc::Rc;

use image::RgbaImage;

use crate::buffer::MarkerId;

/// A chip accepted by the user but not yet bound into the text buffer.
///
/// Created the instant a suggestion is accepted, before any composite image
/// exists, so the host's create notification can fire first. The image and
/// markers are attached during text replacement and the chip is committed
/// when its click marker's added event arrives.
#[derive(Debug)]
pub(crate) struct PendingChip<T> {
    /// Opaque application item backing the chip.
    pub item: Rc<T>,
    /// Composite image, attached once compositing succeeds.
    pub image: Option<RgbaImage>,
    /// Marker carrying the inline image.
    pub image_marker: Option<MarkerId>,
}

impl<T> PendingChip<T> {
    /// Start a pending chip for the given item.
    pub fn new(item: Rc<T>) -> Self {
        Self {
            item,
            image: None,
            image_marker: None,
        }
    }
}

/// A chip committed into the text buffer.
#[derive(Debug)]
pub struct Chip<T> {
    /// Opaque application item, compared by identity only.
    pub(crate) item: Rc<T>,
    /// Composite image occupying the chip's range.
    pub(crate) image: RgbaImage,
    /// Marker carrying the inline image.
    pub(crate) image_marker: MarkerId,
    /// Click handle bound over the same range.
    pub(crate) click_marker: MarkerId,
    /// Length of the separator appended after the chip, captured at commit.
    pub(crate) sep_len: usize,
}

impl<T> Chip<T> {
    /// The application item backing this chip.
    pub fn item(&self) -> &Rc<T> {
        &self.item
    }

    /// The chip's composite image.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Ordered collection of committed chips plus the single pending slot.
///
/// Chips are appended as the user types left to right, so insertion order is
/// also text order.
#[derive(Debug, Default)]
pub(crate) struct ChipRegistry<T> {
    /// Committed chips in text order.
    chips: Vec<Chip<T>>,
    /// The chip under construction, if any. At most one exists at a time.
    pending: Option<PendingChip<T>>,
}

impl<T> ChipRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            chips: Vec::new(),
            pending: None,
        }
    }

    /// Install a pending chip, returning any stale one it displaces.
    pub fn set_pending(&mut self, pending: PendingChip<T>) -> Option<PendingChip<T>> {
        self.pending.replace(pending)
    }

    /// Mutable access to the pending chip.
    pub fn pending_mut(&mut self) -> Option<&mut PendingChip<T>> {
        self.pending.as_mut()
    }

    /// Take the pending chip out of its slot.
    pub fn take_pending(&mut self) -> Option<PendingChip<T>> {
        self.pending.take()
    }

    /// Commit a chip at the end of the sequence.
    pub fn commit(&mut self, chip: Chip<T>) {
        self.chips.push(chip);
    }

    /// Evict and return the chip owning the given click marker.
    pub fn evict_by_click(&mut self, click_marker: MarkerId) -> Option<Chip<T>> {
        let pos = self
            .chips
            .iter()
            .position(|chip| chip.click_marker == click_marker)?;
        Some(self.chips.remove(pos))
    }

    /// Find the chip whose item is reference-identical to `item`.
    pub fn find_by_item(&self, item: &Rc<T>) -> Option<&Chip<T>> {
        self.chips.iter().find(|chip| Rc::ptr_eq(&chip.item, item))
    }

    /// Find the chip owning the given click marker.
    pub fn find_by_click(&self, click_marker: MarkerId) -> Option<&Chip<T>> {
        self.chips
            .iter()
            .find(|chip| chip.click_marker == click_marker)
    }

    /// The last committed chip in text order.
    pub fn last(&self) -> Option<&Chip<T>> {
        self.chips.last()
    }

    /// Committed chips in text order.
    pub fn iter(&self) -> impl Iterator<Item = &Chip<T>> {
        self.chips.iter()
    }

    /// Number of committed chips.
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Whether no chips are committed.
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }
}
