//! Markdown parsing with two front ends over one grammar: a batch parser
//! that returns a finished [`Document`], and a streaming parser that
//! reports blocks to a [`StreamSink`] as soon as they are final.
pub mod ast;
pub mod config;
pub mod error;
pub mod extensions;
pub mod parser;
pub mod stream;

pub use ast::{Document, LinkReference, NodeId, NodeRef, NodeValue, Visitor};
pub use config::ParserOptions;
pub use error::{ConfigError, ParseError};
pub use parser::{MarkdownParser, MarkdownParserBuilder};
pub use stream::{StreamMarkdownParser, StreamSink};

/// Parse `markdown` with default options
pub fn parse(markdown: &str) -> Document {
    MarkdownParser::new().parse(markdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert!(parse("").root_node().children().next().is_none());
    }

    #[test]
    fn test_basic_image() {
        let document = parse("![foo](/url \"title\")\n");
        let image = document
            .root_node()
            .descendants()
            .find(|node| matches!(node.value(), NodeValue::Image { .. }))
            .unwrap();
        assert_eq!(
            image.value(),
            &NodeValue::Image {
                destination: "/url".to_string(),
                title: Some("title".to_string())
            }
        );
        assert_eq!(image.text_content(), "foo");
    }

    #[test]
    fn test_image_without_title() {
        let document = parse("![bar](/path)\n");
        let image = document.root_node().descendants().nth(2).unwrap();
        assert_eq!(
            image.value(),
            &NodeValue::Image {
                destination: "/path".to_string(),
                title: None
            }
        );
    }
}
