//! Chip lifecycle notifications delivered to the host application.

use std::rc::Rc;

/// Receives chip lifecycle notifications.
///
/// Every method defaults to a no-op, so hosts implement only the subset they
/// care about. The item is the opaque application value the chip was created
/// from.
pub trait Callback<T> {
    /// A suggestion was accepted and a chip is about to be created. Fires
    /// before any composite image exists.
    fn on_chip_create(&mut self, _item: &Rc<T>) {}

    /// A chip was committed into the text.
    fn on_chip_added(&mut self, _item: &Rc<T>) {}

    /// A chip was removed from the text.
    fn on_chip_removed(&mut self, _item: &Rc<T>) {}

    /// The user clicked a chip.
    fn on_chip_clicked(&mut self, _item: &Rc<T>) {}
}

/// Callback that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallback;

impl<T> Callback<T> for NoopCallback {}
