// Resume text extraction.
// Turns uploaded PDF bytes into the plain text the match prompt embeds.

pub mod pdf_text;

pub use pdf_text::{extract_text, ExtractionError};
