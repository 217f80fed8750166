//! Content distribution and the assist cycle for formscribe.
//!
//! This crate ties the page layer and the generation client together:
//! - [`Distributor`]: writes generated sections into their fields, with a
//!   description fallback for anything that cannot be placed
//! - [`split_sections`]: turns `## Title` plain text into sections
//! - [`append_transcript`]: dictation append
//! - [`assist`]: read source field → generate → distribute

pub mod dictation;
pub mod distributor;
pub mod pipeline;
pub mod sections;

pub use dictation::append_transcript;
pub use distributor::Distributor;
pub use pipeline::{AssistOptions, AssistProgress, AssistReport, SilentProgress, assist};
pub use sections::{TextSection, sections_to_content, split_sections};
