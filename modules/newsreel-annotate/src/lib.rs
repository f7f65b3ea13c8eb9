//! Article annotation: HTML parsing, language detection, category
//! classification and sentence embedding.

pub mod annotator;
pub mod embedder;
pub mod html;
pub mod lexicon;
pub mod text;

pub use annotator::Annotator;
pub use embedder::WordVecEmbedder;
pub use html::{PageParser, ParsedPage};
pub use lexicon::{CategoryLexicon, LanguageLexicon};
