/// Markdown parser: batch driver and the registry shared with streaming
pub mod block;
pub mod blocks;
pub(crate) mod engine;
pub mod inline;
pub mod reference;

use crate::ast::{Document, Visitor};
use crate::config::ParserOptions;
use crate::error::ParseError;
use crate::extensions::ExtendedAutolinkParserFactory;
use crate::stream::{StreamMarkdownParser, StreamSink};
use block::BlockParserFactory;
use engine::{DocumentParser, Registry};
use inline::extension::InlineContentParserFactory;
use log::debug;
use std::io::BufRead;
use std::sync::Arc;

/// A configured parser. Cheap to clone and shareable across threads; each
/// call to [`MarkdownParser::parse`] or [`MarkdownParser::stream`] works on
/// its own document.
#[derive(Clone)]
pub struct MarkdownParser {
    registry: Arc<Registry>,
}

impl MarkdownParser {
    /// CommonMark only, no extensions
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MarkdownParserBuilder {
        MarkdownParserBuilder::default()
    }

    pub fn options(&self) -> &ParserOptions {
        &self.registry.options
    }

    pub(crate) fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn parse(&self, input: &str) -> Document {
        let mut engine = DocumentParser::new(self.registry(), false);
        for line in split_lines(input) {
            engine.feed_line(line);
        }
        finish(engine)
    }

    /// Parse from a reader line by line. Invalid UTF-8 surfaces as an
    /// [`std::io::ErrorKind::InvalidData`] error.
    pub fn parse_reader<R: BufRead>(&self, reader: R) -> Result<Document, ParseError> {
        let mut engine = DocumentParser::new(self.registry(), false);
        for line in reader.lines() {
            engine.feed_line(&line?);
        }
        Ok(finish(engine))
    }

    /// Parse from a reader and walk the finished tree with `visitor`
    pub fn render_reader<R: BufRead, V: Visitor + ?Sized>(
        &self,
        reader: R,
        visitor: &mut V,
    ) -> Result<Document, ParseError> {
        let document = self.parse_reader(reader)?;
        document.root_node().accept(visitor);
        Ok(document)
    }

    /// Start an incremental parse reporting to `sink`
    pub fn stream<S: StreamSink>(&self, sink: S) -> StreamMarkdownParser<S> {
        StreamMarkdownParser::new(self.registry(), sink)
    }
}

impl Default for MarkdownParser {
    fn default() -> Self {
        Self::new()
    }
}

fn finish(engine: DocumentParser) -> Document {
    let lines = engine.line_count();
    let document = engine.finish();
    debug!(
        "parsed {} lines, {} link references",
        lines,
        document.references().count()
    );
    document
}

/// Lines without their `\n` or `\r\n` terminator. A final line without a
/// terminator is still yielded; an empty input yields nothing.
pub(crate) fn split_lines(input: &str) -> impl Iterator<Item = &str> {
    input.split_inclusive('\n').map(|line| {
        let line = line.strip_suffix('\n').unwrap_or(line);
        line.strip_suffix('\r').unwrap_or(line)
    })
}

/// Collects options and extension factories for a [`MarkdownParser`]
#[derive(Default)]
pub struct MarkdownParserBuilder {
    options: ParserOptions,
    block_factories: Vec<Arc<dyn BlockParserFactory>>,
    inline_factories: Vec<Arc<dyn InlineContentParserFactory>>,
}

impl MarkdownParserBuilder {
    pub fn options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    pub fn gfm(mut self, enabled: bool) -> Self {
        self.options.gfm = enabled;
        self
    }

    pub fn safe_mode(mut self, enabled: bool) -> Self {
        self.options.safe_mode = enabled;
        self
    }

    pub fn generate_heading_ids(mut self, enabled: bool) -> Self {
        self.options.generate_heading_ids = enabled;
        self
    }

    /// Register a block factory, tried after the built-in blocks
    pub fn block_parser_factory(mut self, factory: impl BlockParserFactory + 'static) -> Self {
        self.block_factories.push(Arc::new(factory));
        self
    }

    /// Register an inline factory, tried after built-in syntax for its
    /// trigger characters
    pub fn inline_parser_factory(
        mut self,
        factory: impl InlineContentParserFactory + 'static,
    ) -> Self {
        self.inline_factories.push(Arc::new(factory));
        self
    }

    pub fn build(self) -> MarkdownParser {
        let mut block_factories = blocks::built_in_factories(&self.options);
        block_factories.extend(self.block_factories);

        let mut inline_factories: Vec<Arc<dyn InlineContentParserFactory>> = Vec::new();
        if self.options.gfm {
            inline_factories.push(Arc::new(ExtendedAutolinkParserFactory));
        }
        inline_factories.extend(self.inline_factories);

        MarkdownParser {
            registry: Arc::new(Registry {
                options: self.options,
                block_factories,
                inline_factories,
            }),
        }
    }
}
