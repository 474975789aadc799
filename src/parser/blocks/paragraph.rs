use crate::ast::{Document, NodeId, NodeValue};
use crate::parser::block::{BlockContinue, BlockParser, ParserState};
use crate::parser::inline::InlineParser;
use crate::parser::reference::split_references;

/// Accumulates paragraph lines; reference definitions at its start are
/// registered with the document when it closes.
#[derive(Debug, Clone, Default)]
pub struct ParagraphParser {
    lines: Vec<String>,
    content: String,
}

impl ParagraphParser {
    fn raw_content(&self) -> String {
        self.lines.join("\n")
    }
}

impl BlockParser for ParagraphParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::Paragraph
    }

    fn can_have_lazy_continuation_lines(&self) -> bool {
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            None
        } else {
            Some(BlockContinue::AtIndex(state.index()))
        }
    }

    fn add_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn paragraph_content(&self) -> Option<String> {
        let raw = self.raw_content();
        let (_, rest) = split_references(&raw);
        Some(rest.to_string())
    }

    fn close_block(&mut self, document: &mut Document, node: NodeId) {
        let raw = self.raw_content();
        let (references, rest) = split_references(&raw);
        for reference in references {
            document.define_reference(reference);
        }
        self.content = rest.trim_end().to_string();
        if self.content.is_empty() {
            document.unlink(node);
        }
    }

    fn parse_inlines(&mut self, inline: &mut InlineParser, document: &mut Document, node: NodeId) {
        if !self.content.is_empty() {
            inline.parse(&self.content, document, node);
        }
    }
}
