/// Fenced and indented code blocks
use crate::ast::{Document, NodeId, NodeValue};
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, CODE_BLOCK_INDENT, MatchedBlock,
    ParserState, is_blank,
};
use crate::parser::inline::scan::unescape;

#[derive(Debug, Clone)]
pub struct FencedCodeParser {
    fence_char: u8,
    fence_length: usize,
    fence_indent: usize,
    info: Option<String>,
    lines: Vec<String>,
}

impl FencedCodeParser {
    fn is_closing_fence(&self, rest: &str) -> bool {
        let run = rest.bytes().take_while(|&b| b == self.fence_char).count();
        run >= self.fence_length && is_blank(&rest[run..])
    }
}

impl BlockParser for FencedCodeParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::CodeBlock {
            fenced: true,
            info: String::new(),
            literal: String::new(),
        }
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.indent() < CODE_BLOCK_INDENT && self.is_closing_fence(state.rest()) {
            return Some(BlockContinue::Finished);
        }
        // Strip up to the opening fence's indentation
        let bytes = state.line().as_bytes();
        let mut index = state.index();
        let mut remaining = self.fence_indent;
        while remaining > 0 && bytes.get(index) == Some(&b' ') {
            index += 1;
            remaining -= 1;
        }
        Some(BlockContinue::AtIndex(index))
    }

    fn add_line(&mut self, line: &str) {
        if self.info.is_none() {
            self.info = Some(line.to_string());
        } else {
            self.lines.push(line.to_string());
        }
    }

    fn close_block(&mut self, document: &mut Document, node: NodeId) {
        let info_string = self.info.as_deref().map(str::trim).unwrap_or_default();
        let info_string = unescape(info_string).into_owned();
        let mut content = String::new();
        for line in &self.lines {
            content.push_str(line);
            content.push('\n');
        }
        if let NodeValue::CodeBlock { info, literal, .. } = document.value_mut(node) {
            *info = info_string;
            *literal = content;
        }
    }
}

pub struct FencedCodeParserFactory;

impl BlockParserFactory for FencedCodeParserFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let rest = state.rest();
        let fence_char = *rest.as_bytes().first()?;
        if fence_char != b'`' && fence_char != b'~' {
            return None;
        }
        let fence_length = rest.bytes().take_while(|&b| b == fence_char).count();
        if fence_length < 3 {
            return None;
        }
        // Backtick fences cannot have backticks in the info string
        if fence_char == b'`' && rest[fence_length..].contains('`') {
            return None;
        }
        let parser = FencedCodeParser {
            fence_char,
            fence_length,
            fence_indent: state.indent(),
            info: None,
            lines: Vec::new(),
        };
        Some(BlockStart::of(parser).at_index(state.next_non_space_index() + fence_length))
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndentedCodeParser {
    lines: Vec<String>,
}

impl BlockParser for IndentedCodeParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::CodeBlock {
            fenced: false,
            info: String::new(),
            literal: String::new(),
        }
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.indent() >= CODE_BLOCK_INDENT {
            Some(BlockContinue::AtColumn(state.column() + CODE_BLOCK_INDENT))
        } else if state.is_blank() {
            Some(BlockContinue::AtIndex(state.next_non_space_index()))
        } else {
            None
        }
    }

    fn add_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn close_block(&mut self, document: &mut Document, node: NodeId) {
        // Trailing blank lines are not part of the block
        while self.lines.last().is_some_and(|line| is_blank(line)) {
            self.lines.pop();
        }
        let mut content = String::new();
        for line in &self.lines {
            content.push_str(line);
            content.push('\n');
        }
        if let NodeValue::CodeBlock { literal, .. } = document.value_mut(node) {
            *literal = content;
        }
    }
}

pub struct IndentedCodeParserFactory;

impl BlockParserFactory for IndentedCodeParserFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: MatchedBlock<'_>) -> Option<BlockStart> {
        // An indented line after a paragraph is a lazy continuation
        if state.indent() < CODE_BLOCK_INDENT
            || state.is_blank()
            || matches!(state.active_block(), NodeValue::Paragraph)
        {
            return None;
        }
        Some(BlockStart::of(IndentedCodeParser::default()).at_column(state.column() + CODE_BLOCK_INDENT))
    }
}
