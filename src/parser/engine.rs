/// Line-at-a-time block structure engine
use crate::ast::{Document, NodeId, NodeValue};
use crate::config::ParserOptions;
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, MatchedBlock, ParserState,
    expand_tabs, is_space_or_tab,
};
use crate::parser::blocks::document::DocumentBlockParser;
use crate::parser::blocks::paragraph::ParagraphParser;
use crate::parser::inline::InlineParser;
use crate::parser::inline::extension::InlineContentParserFactory;
use log::trace;
use std::sync::Arc;

/// Everything fixed when a parser is built
pub(crate) struct Registry {
    pub options: ParserOptions,
    pub block_factories: Vec<Arc<dyn BlockParserFactory>>,
    pub inline_factories: Vec<Arc<dyn InlineContentParserFactory>>,
}

/// Structural changes reported to the streaming driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockEvent {
    Opened(NodeId),
    Closed(NodeId),
    Rendered(NodeId),
}

#[derive(Clone)]
struct OpenBlock {
    parser: Box<dyn BlockParser>,
    node: NodeId,
}

/// Position within the line being incorporated
#[derive(Debug, Default, Clone)]
struct LineCursor {
    line: String,
    index: usize,
    column: usize,
    next_non_space: usize,
    next_non_space_column: usize,
    blank: bool,
}

impl LineCursor {
    fn reset(&mut self, line: &str) {
        self.line = expand_tabs(line).into_owned();
        self.index = 0;
        self.column = 0;
        self.find_next_non_space();
    }

    fn state<'a>(&'a self, active: &'a NodeValue, options: &'a ParserOptions) -> ParserState<'a> {
        ParserState {
            line: &self.line,
            index: self.index,
            column: self.column,
            next_non_space: self.next_non_space,
            next_non_space_column: self.next_non_space_column,
            blank: self.blank,
            active,
            options,
        }
    }

    fn find_next_non_space(&mut self) {
        let bytes = self.line.as_bytes();
        let mut i = self.index;
        while i < bytes.len() && is_space_or_tab(bytes[i]) {
            i += 1;
        }
        self.next_non_space = i;
        self.next_non_space_column = self.column + (i - self.index);
        self.blank = i == bytes.len();
    }

    fn set_new_index(&mut self, new_index: usize) {
        let mut new_index = new_index.min(self.line.len());
        while !self.line.is_char_boundary(new_index) {
            new_index += 1;
        }
        if new_index > self.index {
            self.column += self.line[self.index..new_index].chars().count();
            self.index = new_index;
        }
    }

    fn set_new_column(&mut self, new_column: usize) {
        let mut index = self.line.len();
        let mut column = self.column;
        for (offset, _) in self.line[self.index..].char_indices() {
            if column >= new_column {
                index = self.index + offset;
                break;
            }
            column += 1;
        }
        self.index = index;
        self.column = column;
    }

    fn apply(&mut self, result: BlockContinue) {
        match result {
            BlockContinue::AtIndex(index) => self.set_new_index(index),
            BlockContinue::AtColumn(column) => self.set_new_column(column),
            BlockContinue::Finished => {}
        }
    }

    fn rest(&self) -> &str {
        &self.line[self.index..]
    }
}

pub(crate) struct DocumentParser {
    registry: Arc<Registry>,
    document: Document,
    open_blocks: Vec<OpenBlock>,
    inline: InlineParser,
    cursor: LineCursor,
    events: Option<Vec<BlockEvent>>,
    line_count: usize,
}

impl DocumentParser {
    pub fn new(registry: Arc<Registry>, record_events: bool) -> Self {
        Self::with_document(registry, Document::new(), record_events)
    }

    fn with_document(registry: Arc<Registry>, document: Document, record_events: bool) -> Self {
        let root = document.root();
        let inline = InlineParser::new(registry.options, &registry.inline_factories);
        DocumentParser {
            registry,
            document,
            open_blocks: vec![OpenBlock {
                parser: Box::new(DocumentBlockParser),
                node: root,
            }],
            inline,
            cursor: LineCursor::default(),
            events: record_events.then(Vec::new),
            line_count: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Nodes of the open blocks, root first
    pub fn open_nodes(&self) -> Vec<NodeId> {
        self.open_blocks.iter().map(|b| b.node).collect()
    }

    /// Whether the block at `depth` of the stack is a container
    pub fn is_open_container(&self, depth: usize) -> bool {
        self.open_blocks
            .get(depth)
            .is_some_and(|b| b.parser.is_container())
    }

    pub fn take_events(&mut self) -> Vec<BlockEvent> {
        self.events.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Process one line, without its line terminator
    pub fn feed_line(&mut self, line: &str) {
        self.cursor.reset(line);
        self.line_count += 1;
        self.incorporate_line();
    }

    /// Close every open block, root included
    pub fn close_all(&mut self) {
        let open = self.open_blocks.len();
        self.close_block_parsers(open);
    }

    pub fn finish(mut self) -> Document {
        self.close_all();
        self.document
    }

    /// An independent copy of the open-block state over a scratch document.
    /// Open nodes are copied without their finished children; closed blocks
    /// stay behind in the real document. Returns the copied open nodes,
    /// root first.
    pub fn snapshot(&self) -> (DocumentParser, Vec<NodeId>) {
        let mut document = self.document.fork_tables();
        let mut open_blocks: Vec<OpenBlock> = Vec::with_capacity(self.open_blocks.len());
        for block in &self.open_blocks {
            let node = match open_blocks.last() {
                None => document.root(),
                Some(parent) => {
                    let copy = document.create_node(self.document.value(block.node).clone());
                    document.append_child(parent.node, copy);
                    copy
                }
            };
            open_blocks.push(OpenBlock {
                parser: block.parser.clone(),
                node,
            });
        }
        let nodes = open_blocks.iter().map(|b| b.node).collect();
        let mut scratch = Self::with_document(self.registry.clone(), document, false);
        scratch.open_blocks = open_blocks;
        (scratch, nodes)
    }

    fn active_node(&self) -> NodeId {
        self.open_blocks.last().map_or(self.document.root(), |b| b.node)
    }

    fn active_parser(&mut self) -> Option<&mut Box<dyn BlockParser>> {
        self.open_blocks.last_mut().map(|b| &mut b.parser)
    }

    fn incorporate_line(&mut self) {
        let mut matches = 1;
        for i in 1..self.open_blocks.len() {
            self.cursor.find_next_non_space();
            let active = self.active_node();
            let state = self
                .cursor
                .state(self.document.value(active), &self.registry.options);
            match self.open_blocks[i].parser.try_continue(&state) {
                Some(BlockContinue::Finished) => {
                    // The block took the whole line, e.g. a closing code fence
                    let count = self.open_blocks.len() - i;
                    self.close_block_parsers(count);
                    return;
                }
                Some(result) => {
                    self.cursor.apply(result);
                    matches += 1;
                }
                None => break,
            }
        }

        let mut unmatched = self.open_blocks.len() - matches;
        let mut matched_depth = matches - 1;
        let mut started_new_block = false;
        let mut try_block_starts = {
            let block = &self.open_blocks[matched_depth];
            block.parser.is_container()
                || matches!(self.document.value(block.node), NodeValue::Paragraph)
        };

        while try_block_starts {
            self.cursor.find_next_non_space();
            if self.cursor.blank {
                self.cursor.set_new_index(self.cursor.next_non_space);
                break;
            }

            let Some(start) = self.find_block_start(matched_depth) else {
                self.cursor.set_new_index(self.cursor.next_non_space);
                break;
            };

            started_new_block = true;
            if unmatched > 0 {
                self.close_block_parsers(unmatched);
                unmatched = 0;
            }
            if let Some(index) = start.index {
                self.cursor.set_new_index(index);
            } else if let Some(column) = start.column {
                self.cursor.set_new_column(column);
            }
            if start.replace_active {
                self.replace_active_block();
            }

            try_block_starts = false;
            for parser in start.parsers {
                try_block_starts = parser.is_container();
                self.add_child(parser);
            }
            matched_depth = self.open_blocks.len() - 1;
        }

        let rest = self.cursor.rest().to_string();
        let lazy = !started_new_block
            && !self.cursor.blank
            && self
                .open_blocks
                .last()
                .is_some_and(|b| b.parser.can_have_lazy_continuation_lines());
        if lazy {
            // Unmatched containers stay open around a lazy paragraph line
            if let Some(parser) = self.active_parser() {
                parser.add_line(&rest);
            }
            return;
        }

        if unmatched > 0 {
            self.close_block_parsers(unmatched);
        }
        let active_is_container = self
            .open_blocks
            .last()
            .is_none_or(|b| b.parser.is_container());
        if !active_is_container {
            if let Some(parser) = self.active_parser() {
                parser.add_line(&rest);
            }
        } else if !self.cursor.blank {
            self.add_child(Box::new(ParagraphParser::default()));
            if let Some(parser) = self.active_parser() {
                parser.add_line(&rest);
            }
        }
    }

    fn find_block_start(&self, matched_depth: usize) -> Option<BlockStart> {
        let state = self
            .cursor
            .state(self.document.value(self.active_node()), &self.registry.options);
        let matched_block = &self.open_blocks[matched_depth];
        let matched = MatchedBlock {
            parser: matched_block.parser.as_ref(),
            value: self.document.value(matched_block.node),
        };
        self.registry
            .block_factories
            .iter()
            .find_map(|factory| factory.try_start(&state, matched))
    }

    /// Close the active block for a block that takes over its content
    fn replace_active_block(&mut self) {
        if self.open_blocks.len() <= 1 {
            return;
        }
        if let Some(mut old) = self.open_blocks.pop() {
            old.parser.close_block(&mut self.document, old.node);
            self.document.unlink(old.node);
        }
    }

    fn add_child(&mut self, parser: Box<dyn BlockParser>) {
        let value = parser.create_block();
        while self.open_blocks.len() > 1
            && !self
                .active_parser()
                .is_some_and(|active| active.can_contain(&value))
        {
            self.close_block_parsers(1);
        }

        let parent = self.active_node();
        let node = self.document.create_node(value);
        self.document.append_child(parent, node);
        trace!(
            "opened {} at depth {}",
            self.document.value(node).kind_name(),
            self.open_blocks.len()
        );
        if parser.is_container() {
            self.emit(BlockEvent::Opened(node));
        }
        self.open_blocks.push(OpenBlock { parser, node });
    }

    fn close_block_parsers(&mut self, count: usize) {
        for _ in 0..count {
            let Some(mut block) = self.open_blocks.pop() else {
                return;
            };
            block.parser.close_block(&mut self.document, block.node);
            block
                .parser
                .parse_inlines(&mut self.inline, &mut self.document, block.node);
            trace!(
                "closed {} at depth {}",
                self.document.value(block.node).kind_name(),
                self.open_blocks.len()
            );
            if block.node == self.document.root() {
                continue;
            }
            if block.parser.is_container() {
                self.emit(BlockEvent::Closed(block.node));
            } else {
                self.emit(BlockEvent::Rendered(block.node));
            }
        }
    }

    fn emit(&mut self, event: BlockEvent) {
        if let Some(events) = self.events.as_mut() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MarkdownParser;
    use pretty_assertions::assert_eq;

    fn engine(record_events: bool) -> DocumentParser {
        let parser = MarkdownParser::new();
        DocumentParser::new(parser.registry(), record_events)
    }

    #[test]
    fn paragraph_stays_open_until_blank_line() {
        let mut engine = engine(true);
        engine.feed_line("hello");
        assert_eq!(engine.open_nodes().len(), 2);
        assert!(engine.take_events().is_empty());

        engine.feed_line("");
        assert_eq!(engine.open_nodes().len(), 1);
        let events = engine.take_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], BlockEvent::Rendered(_)));
    }

    #[test]
    fn nested_containers_open_on_one_line() {
        let mut engine = engine(true);
        engine.feed_line("> - foo");
        let events = engine.take_events();
        let opened: Vec<&str> = events
            .iter()
            .map(|event| match event {
                BlockEvent::Opened(id) => engine.document().value(*id).kind_name(),
                _ => "other",
            })
            .collect();
        assert_eq!(opened, vec!["block_quote", "list", "list_item"]);
    }

    #[test]
    fn containers_close_in_reverse_order() {
        let mut engine = engine(true);
        engine.feed_line("> - foo");
        engine.take_events();
        engine.close_all();
        let kinds: Vec<String> = engine
            .take_events()
            .iter()
            .map(|event| match event {
                BlockEvent::Opened(id) => format!("open {}", engine.document().value(*id).kind_name()),
                BlockEvent::Closed(id) => format!("close {}", engine.document().value(*id).kind_name()),
                BlockEvent::Rendered(id) => format!("render {}", engine.document().value(*id).kind_name()),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "render paragraph",
                "close list_item",
                "close list",
                "close block_quote"
            ]
        );
    }

    #[test]
    fn lazy_line_keeps_quote_open() {
        let mut engine = engine(false);
        engine.feed_line("> foo");
        engine.feed_line("bar");
        assert_eq!(engine.open_nodes().len(), 3);
        let document = engine.finish();
        let quote = document.first_child(document.root()).unwrap();
        assert_eq!(document.value(quote), &NodeValue::BlockQuote);
        assert_eq!(document.node(quote).text_content(), "foo bar");
    }

    #[test]
    fn snapshot_does_not_touch_the_real_tree() {
        let mut engine = engine(true);
        engine.feed_line("> quoted");
        engine.take_events();
        let (mut scratch, nodes) = engine.snapshot();
        assert_eq!(nodes.len(), 3);
        scratch.feed_line("more");
        scratch.close_all();
        assert!(scratch.take_events().is_empty());

        assert_eq!(engine.open_nodes().len(), 3);
        assert!(engine.take_events().is_empty());
        let document = engine.finish();
        assert_eq!(document.root_node().text_content(), "quoted");
    }

    #[test]
    fn snapshot_shares_committed_references() {
        let mut engine = engine(true);
        for i in 0..2000 {
            engine.feed_line(&format!("[r{}]: /u{}", i, i));
        }
        engine.feed_line("");
        assert_eq!(engine.document().references().count(), 2000);

        let (mut scratch, _) = engine.snapshot();
        assert!(scratch.document().shares_tables_with(engine.document()));
        scratch.feed_line("[late]: /late");
        scratch.close_all();
        assert!(scratch.document().reference("late").is_some());
        assert!(scratch.document().shares_tables_with(engine.document()));
        assert!(engine.document().reference("late").is_none());
    }
}
