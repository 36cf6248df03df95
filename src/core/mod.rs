pub mod document;
pub mod tokenizer;

pub use document::{LogDocument, LogMessage, PatternConfig};
pub use tokenizer::{HighlightStyle, HighlighterSet, Token};
