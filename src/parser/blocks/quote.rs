use crate::ast::NodeValue;
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, CODE_BLOCK_INDENT, MatchedBlock,
    ParserState,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockQuoteParser;

/// Column just past `>` and its optional following space
fn marker_end(state: &ParserState<'_>) -> Option<usize> {
    if state.indent() >= CODE_BLOCK_INDENT || state.next_char() != Some('>') {
        return None;
    }
    let mut column = state.column() + state.indent() + 1;
    if state.line().as_bytes().get(state.next_non_space_index() + 1) == Some(&b' ') {
        column += 1;
    }
    Some(column)
}

impl BlockParser for BlockQuoteParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::BlockQuote
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, child: &NodeValue) -> bool {
        !matches!(child, NodeValue::ListItem { .. })
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        marker_end(state).map(BlockContinue::AtColumn)
    }
}

pub struct BlockQuoteParserFactory;

impl BlockParserFactory for BlockQuoteParserFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: MatchedBlock<'_>) -> Option<BlockStart> {
        let column = marker_end(state)?;
        Some(BlockStart::of(BlockQuoteParser).at_column(column))
    }
}
