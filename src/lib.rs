//! Fills the `Full Name:`, `Job Title:` and `Department:` labels of a DOCX
//! template while keeping each run's formatting.

pub mod config;
pub mod docx;
pub mod error;
pub mod generator;
pub mod ir;
pub mod label;
pub mod progress;
pub mod rewrite;
pub mod textutil;

pub use error::NocError;
pub use generator::{fill_document, output_file_name, Field, FillReport, NocGenerator, Replacements};
pub use label::{locate_label, LabelMatch, LabelPattern};
pub use rewrite::{fill_paragraph, rewrite_label_in_paragraph, FillOutcome};
