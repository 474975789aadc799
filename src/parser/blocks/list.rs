/// Bullet and ordered lists, their items, and GFM task markers
use crate::ast::{Document, ListKind, NodeId, NodeValue};
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, CODE_BLOCK_INDENT, MatchedBlock,
    ParserState, is_blank,
};

#[derive(Debug, Clone)]
pub struct ListBlockParser {
    kind: ListKind,
    tight: bool,
    had_blank_line: bool,
    lines_after_blank: usize,
}

impl ListBlockParser {
    pub fn new(kind: ListKind) -> Self {
        ListBlockParser {
            kind,
            tight: true,
            had_blank_line: false,
            lines_after_blank: 0,
        }
    }
}

impl BlockParser for ListBlockParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::List {
            kind: self.kind,
            tight: true,
        }
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, child: &NodeValue) -> bool {
        if !matches!(child, NodeValue::ListItem { .. }) {
            return false;
        }
        // A blank line right before a new item makes the list loose
        if self.had_blank_line && self.lines_after_blank == 1 {
            self.tight = false;
            self.had_blank_line = false;
        }
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            self.had_blank_line = true;
            self.lines_after_blank = 0;
        } else if self.had_blank_line {
            self.lines_after_blank += 1;
        }
        // Only items carry markers; a non-item child closes the list
        Some(BlockContinue::AtIndex(state.index()))
    }

    fn close_block(&mut self, document: &mut Document, node: NodeId) {
        if !self.tight
            && let NodeValue::List { tight, .. } = document.value_mut(node)
        {
            *tight = false;
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListItemParser {
    content_indent: usize,
    task: Option<bool>,
    had_blank_line: bool,
    has_children: bool,
    loosens_list: bool,
}

impl ListItemParser {
    fn new(content_indent: usize, task: Option<bool>) -> Self {
        ListItemParser {
            content_indent,
            task,
            had_blank_line: false,
            has_children: false,
            loosens_list: false,
        }
    }
}

impl BlockParser for ListItemParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::ListItem { task: self.task }
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, child: &NodeValue) -> bool {
        if matches!(child, NodeValue::ListItem { .. }) {
            return false;
        }
        if self.had_blank_line {
            self.loosens_list = true;
        }
        self.has_children = true;
        true
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            // An item can begin with at most one blank line
            if !self.has_children {
                return None;
            }
            // Blank lines inside code blocks don't affect tightness
            self.had_blank_line = matches!(
                state.active_block(),
                NodeValue::Paragraph | NodeValue::ListItem { .. }
            );
            return Some(BlockContinue::AtIndex(state.next_non_space_index()));
        }
        if state.indent() >= self.content_indent {
            return Some(BlockContinue::AtColumn(state.column() + self.content_indent));
        }
        None
    }

    fn close_block(&mut self, document: &mut Document, node: NodeId) {
        if !self.loosens_list {
            return;
        }
        if let Some(parent) = document.parent(node)
            && let NodeValue::List { tight, .. } = document.value_mut(parent)
        {
            *tight = false;
        }
    }
}

/// Parsed list marker at the start of a line
#[derive(Debug, Clone, Copy, PartialEq)]
struct ListMarker {
    kind: ListKind,
    /// Column where item content starts
    content_column: usize,
    /// Offset after the marker and its spacing
    content_index: usize,
    has_content: bool,
}

fn parse_list_marker(state: &ParserState<'_>, in_paragraph: bool) -> Option<ListMarker> {
    let rest = state.rest();
    let bytes = rest.as_bytes();
    let marker_column = state.column() + state.indent();

    let (kind, marker_length) = match *bytes.first()? {
        c @ (b'-' | b'+' | b'*') => (ListKind::Bullet(c as char), 1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 {
                return None;
            }
            let delimiter = match bytes.get(digits) {
                Some(b'.') => '.',
                Some(b')') => ')',
                _ => return None,
            };
            let start = rest[..digits].parse::<u32>().ok()?;
            (ListKind::Ordered { start, delimiter }, digits + 1)
        }
        _ => return None,
    };

    let after = &rest[marker_length..];
    if !(after.is_empty() || after.starts_with(' ')) {
        return None;
    }
    // Only an ordered list starting at 1 may interrupt a paragraph
    if in_paragraph && matches!(kind, ListKind::Ordered { start, .. } if start != 1) {
        return None;
    }

    let spaces = after.bytes().take_while(|&b| b == b' ').count();
    let has_content = !is_blank(after);
    if in_paragraph && !has_content {
        return None;
    }

    // Five or more spaces mean the content is indented code
    let padding = if !has_content || spaces > CODE_BLOCK_INDENT {
        1
    } else {
        spaces
    };
    Some(ListMarker {
        kind,
        content_column: marker_column + marker_length + padding,
        content_index: state.next_non_space_index() + marker_length + padding.min(after.len()),
        has_content,
    })
}

/// `[ ]`, `[x]` or `[X]` followed by a space and content
fn parse_task_marker(content: &str) -> Option<bool> {
    let bytes = content.as_bytes();
    if bytes.len() < 5 || bytes[0] != b'[' || bytes[2] != b']' || bytes[3] != b' ' {
        return None;
    }
    if is_blank(&content[4..]) {
        return None;
    }
    match bytes[1] {
        b' ' => Some(false),
        b'x' | b'X' => Some(true),
        _ => None,
    }
}

fn lists_match(a: ListKind, b: ListKind) -> bool {
    match (a, b) {
        (ListKind::Bullet(x), ListKind::Bullet(y)) => x == y,
        (ListKind::Ordered { delimiter: x, .. }, ListKind::Ordered { delimiter: y, .. }) => x == y,
        _ => false,
    }
}

pub struct ListItemParserFactory;

impl BlockParserFactory for ListItemParserFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let in_paragraph = matched
            .paragraph_content()
            .is_some_and(|content| !content.is_empty());
        let marker = parse_list_marker(state, in_paragraph)?;

        let mut start_column = marker.content_column;
        let mut task = None;
        if state.options().gfm && marker.has_content {
            task = parse_task_marker(&state.line()[marker.content_index..]);
            if task.is_some() {
                start_column += 4;
            }
        }

        let item = ListItemParser::new(marker.content_column - state.column(), task);
        match matched.value() {
            NodeValue::List { kind, .. } if lists_match(*kind, marker.kind) => {
                Some(BlockStart::of(item).at_column(start_column))
            }
            _ => Some(
                BlockStart::of_many(vec![
                    Box::new(ListBlockParser::new(marker.kind)),
                    Box::new(item),
                ])
                .at_column(start_column),
            ),
        }
    }
}
