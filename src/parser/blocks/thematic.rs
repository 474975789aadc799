use crate::ast::NodeValue;
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, CODE_BLOCK_INDENT, MatchedBlock,
    ParserState,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ThematicBreakParser;

impl BlockParser for ThematicBreakParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::ThematicBreak
    }

    fn try_continue(&mut self, _state: &ParserState<'_>) -> Option<BlockContinue> {
        None
    }
}

pub struct ThematicBreakParserFactory;

impl BlockParserFactory for ThematicBreakParserFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT || !is_thematic_break(state.rest()) {
            return None;
        }
        Some(BlockStart::of(ThematicBreakParser).at_index(state.line().len()))
    }
}

/// Three or more matching `-`, `*` or `_`, optionally separated by spaces
pub(crate) fn is_thematic_break(line: &str) -> bool {
    let mut marks = line.bytes().filter(|&b| b != b' ' && b != b'\t');
    let Some(first) = marks.next() else {
        return false;
    };
    if !matches!(first, b'-' | b'*' | b'_') {
        return false;
    }
    let mut count = 1;
    for b in marks {
        if b != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("***", true)]
    #[case("- - -", true)]
    #[case("_____________________________________", true)]
    #[case(" **  * ** * ** * **", true)]
    #[case("--", false)]
    #[case("+++", false)]
    #[case("_ _ _ _ a", false)]
    #[case("*-*", false)]
    fn detection(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_thematic_break(line), expected);
    }
}
