//! copy-point HTML Loader
//!
//! Builds a `cp_dom::Document` from HTML markup using html5ever.

mod parser;

pub use parser::HtmlParser;

use cp_dom::Document;

/// Parse an HTML string into a document
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed tree: {0}")]
    Tree(#[from] cp_dom::DomError),
}
