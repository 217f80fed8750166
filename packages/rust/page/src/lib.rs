//! Page model, field lookup, and field text I/O.
//!
//! This crate provides:
//! - [`Page`]: a parsed HTML page with live values, markup and events
//! - [`FieldLocator`]: resolves logical field names through a strategy chain
//! - [`read_text`] / [`write_text`]: field text I/O across element kinds
//! - [`FieldWatcher`]: reports fields appearing and disappearing

pub mod document;
pub mod locator;
pub mod text_io;
pub mod watcher;

pub use document::{ElementId, FieldEvent, FieldEventKind, Page, markup_to_text};
pub use locator::{
    ConfiguredSelectors, FieldLocator, FieldTarget, GenericSelectors, LabelScan, LocateStrategy,
};
pub use text_io::{read_text, write_text};
pub use watcher::{FieldTransition, FieldWatcher};
