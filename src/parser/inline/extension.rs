/// Extension points for custom inline syntax
use crate::ast::{Document, LinkReference, NodeValue};
use crate::parser::inline::scan::char_before;

/// Creates per-document inline parsers for a set of trigger characters
pub trait InlineContentParserFactory: Send + Sync {
    /// Characters that may start this inline
    fn trigger_characters(&self) -> Vec<char>;

    fn create(&self) -> Box<dyn InlineContentParser>;
}

pub trait InlineContentParser: Send {
    /// Try to parse at `state.index()`, which holds one of the trigger
    /// characters. Returning `None` makes the engine treat the character as
    /// literal text and move past it.
    fn try_parse(&mut self, state: &InlineParserState<'_>) -> Option<ParsedInline>;
}

/// Read-only view of the inline scan handed to extensions
pub struct InlineParserState<'a> {
    pub(crate) input: &'a str,
    pub(crate) index: usize,
    pub(crate) document: &'a Document,
}

impl<'a> InlineParserState<'a> {
    /// The whole inline content of the block
    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Input from the trigger character on
    pub fn rest(&self) -> &'a str {
        &self.input[self.index..]
    }

    pub fn previous_char(&self) -> Option<char> {
        char_before(self.input, self.index)
    }

    pub fn reference(&self, label: &str) -> Option<&'a LinkReference> {
        self.document.reference(label)
    }
}

/// A parsed inline and the byte offset just past it
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInline {
    pub(crate) value: NodeValue,
    pub(crate) children: Vec<NodeValue>,
    pub(crate) end: usize,
}

impl ParsedInline {
    pub fn new(value: NodeValue, end: usize) -> Self {
        ParsedInline {
            value,
            children: Vec::new(),
            end,
        }
    }

    /// Inline children appended under the parsed node, in order
    pub fn with_children(mut self, children: Vec<NodeValue>) -> Self {
        self.children = children;
        self
    }

    pub fn end(&self) -> usize {
        self.end
    }
}
