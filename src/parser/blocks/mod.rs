//! Built-in block parsers
pub mod code;
pub mod document;
pub mod heading;
pub mod html;
pub mod list;
pub mod paragraph;
pub mod quote;
pub mod table;
pub mod thematic;

use crate::config::ParserOptions;
use crate::parser::block::BlockParserFactory;
use std::sync::Arc;

/// Built-in factories in the order they are tried
pub(crate) fn built_in_factories(options: &ParserOptions) -> Vec<Arc<dyn BlockParserFactory>> {
    let mut factories: Vec<Arc<dyn BlockParserFactory>> = vec![
        Arc::new(quote::BlockQuoteParserFactory),
        Arc::new(heading::HeadingParserFactory),
        Arc::new(code::FencedCodeParserFactory),
    ];
    if !options.safe_mode {
        factories.push(Arc::new(html::HtmlBlockParserFactory));
    }
    factories.push(Arc::new(thematic::ThematicBreakParserFactory));
    factories.push(Arc::new(list::ListItemParserFactory));
    factories.push(Arc::new(code::IndentedCodeParserFactory));
    if options.gfm {
        factories.push(Arc::new(table::TableParserFactory));
    }
    factories
}
