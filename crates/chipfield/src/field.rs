//! The chip-span autocomplete field engine.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use image::RgbaImage;
use tracing::{debug, trace, warn};

use crate::buffer::{Marker, MarkerEvent, MarkerId, MarkerKind, SpanBuffer};
use crate::callback::{Callback, NoopCallback};
use crate::compose::compose;
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerHandle};
use crate::registry::{Chip, ChipRegistry, PendingChip};
use crate::tokenizer::{BoundaryTokenizer, Tokenizer};

/// Converts accepted autocomplete suggestions into inline chip spans.
///
/// The field owns the text buffer, the layer descriptors that shape each
/// chip's composite image, and the bookkeeping that keeps chip ranges and the
/// token boundary consistent as text and chips change. All operations are
/// synchronous and run on the caller's thread; text mutation and marker
/// bookkeeping within one call form a single logical transaction.
pub struct ChipField<T> {
    /// Text buffer with chip range markers.
    buffer: SpanBuffer,
    /// Committed chips plus the single pending slot.
    registry: ChipRegistry<T>,
    /// Layer descriptors applied to subsequently created chips.
    layers: Vec<LayerHandle>,
    /// Background shared by all chips, bottom of the layer stack.
    background: Option<RgbaImage>,
    /// Separator appended after each chip.
    separator: String,
    /// Whether clicking a chip also removes it.
    auto_remove: bool,
    /// Host notification sink.
    callback: Box<dyn Callback<T>>,
    /// Token boundary tracker.
    tokenizer: BoundaryTokenizer,
    /// Current cursor offset in chars.
    cursor: usize,
}

impl<T> Default for ChipField<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChipField<T> {
    /// Create an empty field with a single-space separator, auto-remove off,
    /// and a no-op callback.
    pub fn new() -> Self {
        Self {
            buffer: SpanBuffer::new(),
            registry: ChipRegistry::new(),
            layers: Vec::new(),
            background: None,
            separator: " ".into(),
            auto_remove: false,
            callback: Box::new(NoopCallback),
            tokenizer: BoundaryTokenizer::new(),
            cursor: 0,
        }
    }

    /// Install the host notification sink.
    pub fn set_callback(&mut self, callback: Box<dyn Callback<T>>) {
        self.callback = callback;
    }

    /// Automatically remove a chip when it gets clicked.
    pub fn set_auto_remove(&mut self, auto: bool) {
        self.auto_remove = auto;
    }

    /// Set the separator appended after each chip. Accepts a `char` or any
    /// string-like value.
    pub fn set_separator(&mut self, separator: impl Into<String>) {
        self.separator = separator.into();
    }

    /// Set the background image shared by all chips. It is placed at the
    /// bottom of the layer stack; without layers it has no effect.
    pub fn set_background(&mut self, background: RgbaImage) {
        self.background = Some(background);
    }

    /// Clear the shared background image.
    pub fn clear_background(&mut self) {
        self.background = None;
    }

    /// Create a new layer descriptor applied to subsequently created chips.
    /// The returned handle stays valid for in-place reconfiguration.
    pub fn create_layer(&mut self) -> LayerHandle {
        let handle: LayerHandle = Rc::new(RefCell::new(Layer::default()));
        self.layers.push(handle.clone());
        handle
    }

    /// Destroy a layer descriptor. Unknown handles are a no-op.
    pub fn destroy_layer(&mut self, handle: &LayerHandle) {
        self.layers.retain(|layer| !Rc::ptr_eq(layer, handle));
    }

    /// Replace the tokenizer. Only [`BoundaryTokenizer`] is supported; any
    /// other implementation is rejected.
    pub fn set_tokenizer(&mut self, tokenizer: Box<dyn Tokenizer>) -> Result<()> {
        let any: Box<dyn Any> = tokenizer;
        match any.downcast::<BoundaryTokenizer>() {
            Ok(tokenizer) => {
                self.tokenizer = *tokenizer;
                Ok(())
            }
            Err(_) => Err(Error::Invalid("unsupported tokenizer".into())),
        }
    }

    /// The buffer contents.
    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    /// The cursor offset in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped to the buffer bounds.
    pub fn set_cursor(&mut self, offset: usize) {
        self.cursor = offset.min(self.buffer.len());
    }

    /// The offset where the next autocomplete token may begin.
    pub fn token_start(&self) -> usize {
        self.tokenizer.start()
    }

    /// Items of the committed chips, in text order.
    pub fn chips(&self) -> impl Iterator<Item = &Rc<T>> {
        self.registry.iter().map(Chip::item)
    }

    /// Number of committed chips.
    pub fn chip_count(&self) -> usize {
        self.registry.len()
    }

    /// The committed chip backed by `item`, matched by identity.
    pub fn find_chip(&self, item: &Rc<T>) -> Option<&Chip<T>> {
        self.registry.find_by_item(item)
    }

    /// The current text range of the chip backed by `item`.
    pub fn chip_range(&self, item: &Rc<T>) -> Option<(usize, usize)> {
        let chip = self.registry.find_by_item(item)?;
        self.buffer.range(chip.image_marker)
    }

    /// Insert host-typed text at the cursor.
    pub fn insert(&mut self, text: &str) {
        let at = self.cursor;
        self.buffer.replace(at, at, text);
        self.cursor = at + text.chars().count();
        self.sync();
    }

    /// Delete a char range of host-typed text. A deletion that swallows a
    /// chip's whole range evicts the chip.
    pub fn delete(&mut self, start: usize, end: usize) {
        self.buffer.delete(start, end);
        self.cursor = self.cursor.min(self.buffer.len());
        self.sync();
    }

    /// Accept an autocomplete suggestion for the in-progress token.
    ///
    /// A pending chip for `item` is created first and the create notification
    /// fires before any composite image exists. The token text between the
    /// tracked boundary and the cursor is then replaced: with a composite
    /// image bound over the replacement when layers are configured, or as
    /// plain text when compositing yields nothing.
    pub fn accept(&mut self, item: Rc<T>, display: &str) {
        // Defensively clear the slot. A stale pending chip can only exist if
        // a previous acceptance never reached its replacement.
        if self.registry.take_pending().is_some() {
            warn!("discarding stale pending chip");
        }
        self.callback.on_chip_create(&item);
        self.registry.set_pending(PendingChip::new(item));

        let end = self.cursor;
        let start = self.tokenizer.find_token_start(self.buffer.text(), end);
        let replacement = self.tokenizer.terminate_token(display);
        trace!(start, end, text = %replacement, "replacing token");

        match compose(&self.layers, self.background.as_ref()) {
            None => {
                // No image-bearing layers. Fall back to plain text.
                self.registry.take_pending();
                self.buffer.replace(start, end, &replacement);
            }
            Some(composite) => {
                if let Some(pending) = self.registry.pending_mut() {
                    pending.image = Some(composite.image);
                }
                self.buffer.replace(start, end, &replacement);
                self.buffer.rescope();
                let span_end = start + replacement.chars().count();
                let image_marker = self.buffer.bind(MarkerKind::Image, start, span_end);
                if let Some(pending) = self.registry.pending_mut() {
                    pending.image_marker = Some(image_marker);
                }
                self.buffer.bind(MarkerKind::Click, start, span_end);
            }
        }
        self.buffer.append(&self.separator);
        self.cursor = self.buffer.len();
        self.sync();
    }

    /// Dispatch a click at the given char offset.
    ///
    /// When the offset falls inside a chip's click handle, the clicked
    /// notification fires, and with auto-remove enabled the chip's text and
    /// trailing separator are erased and the cursor moves to the buffer end.
    pub fn click_at(&mut self, offset: usize) {
        let Some(marker) = self.buffer.click_marker_at(offset) else {
            return;
        };
        let Some(chip) = self.registry.find_by_click(marker.id) else {
            return;
        };
        let item = chip.item().clone();
        let image_marker = chip.image_marker;
        let sep_len = chip.sep_len;
        self.callback.on_chip_clicked(&item);
        if self.auto_remove {
            self.erase(marker.id, image_marker, sep_len);
        }
    }

    /// Remove the chip backed by `item`, matched by identity. A no-op when no
    /// such chip exists, so repeated removal is safe.
    pub fn remove_chip(&mut self, item: &Rc<T>) {
        let Some(chip) = self.registry.find_by_item(item) else {
            return;
        };
        let click_marker = chip.click_marker;
        let image_marker = chip.image_marker;
        let sep_len = chip.sep_len;
        self.erase(click_marker, image_marker, sep_len);
    }

    /// Erase a chip's markers and its text range plus trailing separator,
    /// then move the cursor to the buffer end.
    fn erase(&mut self, click_marker: MarkerId, image_marker: MarkerId, sep_len: usize) {
        let Some((start, end)) = self.buffer.range(image_marker) else {
            return;
        };
        self.buffer.unbind(image_marker);
        self.buffer.unbind(click_marker);
        self.buffer.delete(start, end + sep_len);
        self.cursor = self.buffer.len();
        self.sync();
    }

    /// Drain marker events queued by buffer mutations, keeping the registry
    /// and the token boundary in step with the text.
    fn sync(&mut self) {
        while let Some(event) = self.buffer.pop_event() {
            match event {
                MarkerEvent::Added(marker) if marker.kind == MarkerKind::Click => {
                    self.click_marker_added(marker);
                }
                MarkerEvent::Removed(marker) if marker.kind == MarkerKind::Click => {
                    self.click_marker_removed(marker);
                }
                // Image markers ride along with their click handle.
                _ => {}
            }
        }
    }

    /// Commit the pending chip now that its click handle is bound.
    fn click_marker_added(&mut self, marker: Marker) {
        let sep_len = self.separator.chars().count();
        self.tokenizer.set_start(marker.end + sep_len);
        let Some(pending) = self.registry.take_pending() else {
            warn!("click handle bound with no pending chip");
            return;
        };
        let PendingChip {
            item,
            image: Some(image),
            image_marker: Some(image_marker),
        } = pending
        else {
            warn!("pending chip missing its image binding");
            return;
        };
        self.registry.commit(Chip {
            item: item.clone(),
            image,
            image_marker,
            click_marker: marker.id,
            sep_len,
        });
        debug!(start = marker.start, end = marker.end, "chip committed");
        self.callback.on_chip_added(&item);
    }

    /// Evict the chip whose click handle went away and rewind the token
    /// boundary to the end of the new last chip.
    fn click_marker_removed(&mut self, marker: Marker) {
        let Some(chip) = self.registry.evict_by_click(marker.id) else {
            return;
        };
        // The paired image marker may still be bound when the removal came
        // from a user-driven edit that only swallowed part of the pair.
        self.buffer.unbind(chip.image_marker);
        match self.registry.last() {
            Some(last) => {
                if let Some((_, end)) = self.buffer.range(last.image_marker) {
                    self.tokenizer.set_start(end + last.sep_len);
                }
            }
            None => self.tokenizer.set_start(0),
        }
        debug!(start = marker.start, end = marker.end, "chip evicted");
        self.callback.on_chip_removed(chip.item());
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;
    use proptest::prelude::*;

    use super::*;
    use crate::layer::Gravity;

    /// Callback that records notification names and items into a shared log.
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Callback<&'static str> for Recorder {
        fn on_chip_create(&mut self, item: &Rc<&'static str>) {
            self.log.borrow_mut().push(format!("create:{item}"));
        }
        fn on_chip_added(&mut self, item: &Rc<&'static str>) {
            self.log.borrow_mut().push(format!("added:{item}"));
        }
        fn on_chip_removed(&mut self, item: &Rc<&'static str>) {
            self.log.borrow_mut().push(format!("removed:{item}"));
        }
        fn on_chip_clicked(&mut self, item: &Rc<&'static str>) {
            self.log.borrow_mut().push(format!("clicked:{item}"));
        }
    }

    fn recorded_field() -> (ChipField<&'static str>, Rc<RefCell<Vec<String>>>) {
        let mut field = ChipField::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        field.set_callback(Box::new(Recorder { log: log.clone() }));
        (field, log)
    }

    fn add_center_layer(field: &mut ChipField<&'static str>, width: u32, height: u32) {
        let layer = field.create_layer();
        layer
            .borrow_mut()
            .set_image(RgbaImage::from_pixel(
                width,
                height,
                Rgba([255, 255, 255, 255]),
            ))
            .set_gravity(Gravity::Center);
    }

    #[test]
    fn plain_text_fallback_without_layers() {
        let (mut field, log) = recorded_field();
        field.accept(Rc::new("cat"), "cat");
        assert_eq!(field.text(), "cat ");
        assert_eq!(field.chip_count(), 0);
        assert_eq!(field.token_start(), 0);
        // The create notification still fires; added does not.
        assert_eq!(*log.borrow(), vec!["create:cat"]);
    }

    #[test]
    fn accepting_with_a_layer_registers_a_chip() {
        let (mut field, log) = recorded_field();
        add_center_layer(&mut field, 20, 10);
        let item = Rc::new("cat");
        field.accept(item.clone(), "cat");

        assert_eq!(field.text(), "cat ");
        assert_eq!(field.chip_count(), 1);
        assert_eq!(field.chip_range(&item), Some((0, 3)));
        assert_eq!(field.token_start(), 4);
        assert_eq!(field.cursor(), 4);
        let chip = field.find_chip(&item).unwrap();
        assert_eq!(chip.image().dimensions(), (20, 10));
        assert_eq!(*log.borrow(), vec!["create:cat", "added:cat"]);
    }

    #[test]
    fn accept_replaces_the_typed_token() {
        let (mut field, _) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        field.insert("ca");
        let item = Rc::new("cat");
        field.accept(item.clone(), "cat");
        assert_eq!(field.text(), "cat ");
        assert_eq!(field.chip_range(&item), Some((0, 3)));
    }

    #[test]
    fn removal_rewinds_the_token_boundary() {
        let (mut field, _) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        let first = Rc::new("a");
        let second = Rc::new("b");
        field.accept(first.clone(), "a");
        field.accept(second.clone(), "b");
        assert_eq!(field.text(), "a b ");
        assert_eq!(field.token_start(), 4);

        field.remove_chip(&first);
        assert_eq!(field.text(), "b ");
        assert_eq!(field.chip_count(), 1);
        // The surviving chip keeps its text, shifted with the edit.
        assert_eq!(field.chip_range(&second), Some((0, 1)));
        assert_eq!(field.token_start(), 2);
    }

    #[test]
    fn removal_by_item_is_idempotent() {
        let (mut field, log) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        let item = Rc::new("a");
        field.accept(item.clone(), "a");
        field.remove_chip(&item);
        field.remove_chip(&item);
        assert_eq!(field.text(), "");
        assert_eq!(
            log.borrow().iter().filter(|e| *e == "removed:a").count(),
            1
        );
    }

    #[test]
    fn removal_matches_identity_not_value() {
        let (mut field, _) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        let item = Rc::new("a");
        field.accept(item.clone(), "a");
        field.remove_chip(&Rc::new("a"));
        assert_eq!(field.chip_count(), 1);
        field.remove_chip(&item);
        assert_eq!(field.chip_count(), 0);
    }

    #[test]
    fn create_then_remove_round_trips() {
        let (mut field, _) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        let anchor = Rc::new("x");
        field.accept(anchor.clone(), "x");
        let text_before = field.text().to_owned();
        let boundary_before = field.token_start();

        let item = Rc::new("y");
        field.accept(item.clone(), "y");
        field.remove_chip(&item);
        assert_eq!(field.text(), text_before);
        assert_eq!(field.token_start(), boundary_before);
    }

    #[test]
    fn click_with_auto_remove_erases_the_chip() {
        let (mut field, log) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        field.set_auto_remove(true);
        let item = Rc::new("x");
        field.accept(item.clone(), "x");
        field.click_at(0);

        assert_eq!(field.text(), "");
        assert_eq!(field.chip_count(), 0);
        assert_eq!(field.cursor(), 0);
        assert_eq!(
            *log.borrow(),
            vec!["create:x", "added:x", "clicked:x", "removed:x"]
        );
    }

    #[test]
    fn click_without_auto_remove_keeps_the_chip() {
        let (mut field, log) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        let item = Rc::new("x");
        field.accept(item.clone(), "x");
        field.click_at(0);
        assert_eq!(field.chip_count(), 1);
        assert_eq!(*log.borrow(), vec!["create:x", "added:x", "clicked:x"]);
        // Clicks outside any chip are ignored.
        field.click_at(3);
        assert_eq!(log.borrow().len(), 3);
    }

    #[test]
    fn user_deletion_through_a_chip_evicts_it() {
        let (mut field, log) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        let item = Rc::new("ab");
        field.accept(item.clone(), "ab");
        assert_eq!(field.text(), "ab ");
        field.delete(0, 3);
        assert_eq!(field.text(), "");
        assert_eq!(field.chip_count(), 0);
        assert_eq!(field.token_start(), 0);
        assert!(log.borrow().contains(&"removed:ab".to_owned()));
    }

    #[test]
    fn custom_separator_length_is_captured_per_chip() {
        let (mut field, _) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        field.set_separator(", ");
        let first = Rc::new("a");
        field.accept(first.clone(), "a");
        assert_eq!(field.text(), "a, ");
        assert_eq!(field.token_start(), 3);

        // Changing the separator afterwards only affects later chips.
        field.set_separator(' ');
        let second = Rc::new("b");
        field.accept(second.clone(), "b");
        assert_eq!(field.text(), "a, b ");
        assert_eq!(field.token_start(), 5);

        field.remove_chip(&second);
        assert_eq!(field.text(), "a, ");
        assert_eq!(field.token_start(), 3);
    }

    #[test]
    fn foreign_tokenizers_are_rejected() {
        struct Foreign;
        impl Tokenizer for Foreign {
            fn find_token_start(&self, _text: &str, _cursor: usize) -> usize {
                0
            }
            fn find_token_end(&self, text: &str, _cursor: usize) -> usize {
                text.chars().count()
            }
            fn terminate_token(&self, text: &str) -> String {
                text.to_owned()
            }
        }

        let mut field: ChipField<&str> = ChipField::new();
        assert_eq!(
            field.set_tokenizer(Box::new(Foreign)),
            Err(Error::Invalid("unsupported tokenizer".into()))
        );
        assert!(
            field
                .set_tokenizer(Box::new(BoundaryTokenizer::new()))
                .is_ok()
        );
    }

    #[test]
    fn destroyed_layers_stop_contributing() {
        let (mut field, _) = recorded_field();
        add_center_layer(&mut field, 4, 4);
        let handle = field.create_layer();
        handle
            .borrow_mut()
            .set_image(RgbaImage::new(10, 10))
            .set_gravity(Gravity::Left);
        field.destroy_layer(&handle);

        let item = Rc::new("a");
        field.accept(item.clone(), "a");
        let chip = field.find_chip(&item).unwrap();
        assert_eq!(chip.image().dimensions(), (4, 4));
    }

    proptest! {
        #[test]
        fn boundary_tracks_the_last_chip(
            lengths in prop::collection::vec(1usize..5, 1..6),
            removal in 0usize..6,
        ) {
            let removal = removal % lengths.len();
            let (mut field, _) = recorded_field();
            add_center_layer(&mut field, 4, 4);

            let texts: Vec<String> = lengths.iter().map(|n| "x".repeat(*n)).collect();
            let items: Vec<Rc<&'static str>> =
                texts.iter().map(|t| Rc::new(&*t.clone().leak())).collect();
            for (item, text) in items.iter().zip(&texts) {
                field.accept(item.clone(), text);
            }

            field.remove_chip(&items[removal]);

            // Chips sit back to back, each followed by one separator char.
            let remaining: usize = lengths
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != removal)
                .map(|(_, n)| n + 1)
                .sum();
            prop_assert_eq!(field.token_start(), remaining);
            prop_assert_eq!(field.text().chars().count(), remaining);
            prop_assert_eq!(field.chip_count(), lengths.len() - 1);
        }
    }
}
