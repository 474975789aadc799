use crate::ast::NodeValue;
use crate::parser::block::{BlockContinue, BlockParser, ParserState};

/// Root of the open-block stack
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentBlockParser;

impl BlockParser for DocumentBlockParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::Document
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, child: &NodeValue) -> bool {
        !matches!(child, NodeValue::ListItem { .. })
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        Some(BlockContinue::AtIndex(state.index()))
    }
}
