//! Chip-span engine for autocomplete text fields.
//!
//! When the host's autocomplete commits a suggestion, the engine composites
//! the configured layer descriptors into a single chip image, binds it as an
//! inline span over the inserted text, and keeps the token boundary and chip
//! registry consistent as chips are added, clicked, and removed. The host
//! windowing toolkit stays outside: it supplies images and display text, and
//! receives lifecycle notifications through a [`Callback`].
//!
//! ```
//! use std::rc::Rc;
//! use chipfield::{ChipField, Gravity};
//! use image::RgbaImage;
//!
//! let mut field: ChipField<&str> = ChipField::new();
//! let layer = field.create_layer();
//! layer
//!     .borrow_mut()
//!     .set_image(RgbaImage::new(16, 16))
//!     .set_gravity(Gravity::Left);
//!
//! let item = Rc::new("cat");
//! field.accept(item.clone(), "cat");
//! assert_eq!(field.text(), "cat ");
//! assert_eq!(field.chip_count(), 1);
//! ```

mod buffer;
mod callback;
mod compose;
pub mod error;
mod field;
mod layer;
mod registry;
mod tokenizer;

pub use buffer::{Marker, MarkerId, MarkerKind, SpanBuffer};
pub use callback::{Callback, NoopCallback};
pub use compose::{Composite, compose};
pub use error::{Error, Result};
pub use field::ChipField;
pub use layer::{Gravity, Layer, LayerHandle, Margins};
pub use registry::Chip;
pub use tokenizer::{BoundaryTokenizer, Tokenizer};
