pub mod document;
pub mod package;
pub mod xml;

pub use document::{Document, Paragraph, Run};
