/// Block parser protocol shared by the built-in blocks and extensions
use crate::ast::{Document, NodeId, NodeValue};
use crate::config::ParserOptions;
use crate::parser::inline::InlineParser;

/// Columns of indentation that turn a line into indented code
pub const CODE_BLOCK_INDENT: usize = 4;

/// One open block on the engine's stack.
///
/// A parser owns whatever the block accumulates while it is open (lines,
/// counters) and writes the finished content into its node when closed.
pub trait BlockParser: BlockParserClone + Send {
    /// Node value created when the block opens
    fn create_block(&self) -> NodeValue;

    fn is_container(&self) -> bool {
        false
    }

    fn can_have_lazy_continuation_lines(&self) -> bool {
        false
    }

    /// Called before a child block is attached under this one
    fn can_contain(&mut self, _child: &NodeValue) -> bool {
        false
    }

    /// Decide whether the current line continues this block.
    /// `None` leaves the block unmatched for this line.
    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue>;

    /// Receive the rest of a line owned by this leaf. The line that opened
    /// the block arrives too, from the start index onwards, even when empty.
    fn add_line(&mut self, _line: &str) {}

    /// Accumulated paragraph text with reference definitions removed.
    /// Only paragraphs return content.
    fn paragraph_content(&self) -> Option<String> {
        None
    }

    /// Write the block's final content into its node
    fn close_block(&mut self, _document: &mut Document, _node: NodeId) {}

    /// Run the inline parser over the block's content, after close
    fn parse_inlines(&mut self, _inline: &mut InlineParser, _document: &mut Document, _node: NodeId) {
    }
}

/// Object-safe cloning so the open-block stack can be snapshotted
pub trait BlockParserClone {
    fn clone_box(&self) -> Box<dyn BlockParser>;
}

impl<T> BlockParserClone for T
where
    T: BlockParser + Clone + 'static,
{
    fn clone_box(&self) -> Box<dyn BlockParser> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn BlockParser> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Recognizes the start of a block type
pub trait BlockParserFactory: Send + Sync {
    fn try_start(&self, state: &ParserState<'_>, matched: MatchedBlock<'_>) -> Option<BlockStart>;
}

/// The line being processed, as seen by block parsers and factories
#[derive(Debug, Clone, Copy)]
pub struct ParserState<'a> {
    pub(crate) line: &'a str,
    pub(crate) index: usize,
    pub(crate) column: usize,
    pub(crate) next_non_space: usize,
    pub(crate) next_non_space_column: usize,
    pub(crate) blank: bool,
    pub(crate) active: &'a NodeValue,
    pub(crate) options: &'a ParserOptions,
}

impl<'a> ParserState<'a> {
    /// The full line, tabs already expanded
    pub fn line(&self) -> &'a str {
        self.line
    }

    /// Byte offset where the current block's content begins
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn next_non_space_index(&self) -> usize {
        self.next_non_space
    }

    /// Spaces between the current position and the next non-space character
    pub fn indent(&self) -> usize {
        self.next_non_space_column - self.column
    }

    pub fn is_blank(&self) -> bool {
        self.blank
    }

    /// Character at the next non-space position
    pub fn next_char(&self) -> Option<char> {
        self.line[self.next_non_space..].chars().next()
    }

    /// Line text from the next non-space character on
    pub fn rest(&self) -> &'a str {
        &self.line[self.next_non_space..]
    }

    /// Node of the deepest open block before this line was processed
    pub fn active_block(&self) -> &'a NodeValue {
        self.active
    }

    pub fn options(&self) -> &'a ParserOptions {
        self.options
    }
}

/// The deepest block matched so far on the current line
#[derive(Clone, Copy)]
pub struct MatchedBlock<'a> {
    pub(crate) parser: &'a dyn BlockParser,
    pub(crate) value: &'a NodeValue,
}

impl<'a> MatchedBlock<'a> {
    pub fn value(&self) -> &'a NodeValue {
        self.value
    }

    /// Content of the matched paragraph, if the matched block is one
    pub fn paragraph_content(&self) -> Option<String> {
        self.parser.paragraph_content()
    }
}

/// Outcome of a successful [`BlockParserFactory::try_start`]
pub struct BlockStart {
    pub(crate) parsers: Vec<Box<dyn BlockParser>>,
    pub(crate) index: Option<usize>,
    pub(crate) column: Option<usize>,
    pub(crate) replace_active: bool,
}

impl BlockStart {
    pub fn of(parser: impl BlockParser + 'static) -> Self {
        Self::of_many(vec![Box::new(parser)])
    }

    /// Several nested blocks opening on the same line, outermost first
    pub fn of_many(parsers: Vec<Box<dyn BlockParser>>) -> Self {
        BlockStart {
            parsers,
            index: None,
            column: None,
            replace_active: false,
        }
    }

    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Close the active block and drop its node; its content is taken over
    /// by the new block (setext headings, tables).
    pub fn replace_active_block_parser(mut self) -> Self {
        self.replace_active = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    AtIndex(usize),
    AtColumn(usize),
    /// The block consumed the line and is complete
    Finished,
}

/// Whether `c` counts as whitespace for block structure
pub(crate) fn is_space_or_tab(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// True when the rest of `s` holds only spaces and tabs
pub(crate) fn is_blank(s: &str) -> bool {
    s.bytes().all(is_space_or_tab)
}

/// Expand tabs to 4-column stops. Columns count chars.
pub(crate) fn expand_tabs(line: &str) -> std::borrow::Cow<'_, str> {
    if !line.contains('\t') {
        return std::borrow::Cow::Borrowed(line);
    }
    let mut expanded = String::with_capacity(line.len() + 8);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let spaces = 4 - (column % 4);
            expanded.extend(std::iter::repeat_n(' ', spaces));
            column += spaces;
        } else {
            expanded.push(c);
            column += 1;
        }
    }
    std::borrow::Cow::Owned(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_expand_to_next_stop() {
        assert_eq!(expand_tabs("\tfoo"), "    foo");
        assert_eq!(expand_tabs("  \tfoo"), "    foo");
        assert_eq!(expand_tabs("a\tb\tc"), "a   b   c");
        assert_eq!(expand_tabs("é\tx"), "é   x");
    }

    #[test]
    fn lines_without_tabs_are_borrowed() {
        assert!(matches!(expand_tabs("plain"), std::borrow::Cow::Borrowed(_)));
    }

    #[test]
    fn blank_detection() {
        assert!(is_blank(""));
        assert!(is_blank("  \t "));
        assert!(!is_blank("  x"));
    }
}
