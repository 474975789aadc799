/// Inline parsing: code spans, emphasis, links, autolinks, raw HTML and
/// extension-provided syntax
pub mod extension;
pub mod scan;

use crate::ast::{Document, NodeId, NodeValue};
use crate::config::ParserOptions;
use extension::{InlineContentParser, InlineContentParserFactory, InlineParserState, ParsedInline};
use log::warn;
use scan::{
    char_at, char_before, decode_entity, is_punctuation, run_length, scan_autolink,
    scan_code_span, scan_html_inline, scan_link_destination, scan_link_label, scan_link_title,
    skip_spaces_and_newline,
};
use std::sync::Arc;

/// Longest allowed link label, in characters
const MAX_LABEL_LENGTH: usize = 999;

struct ExtensionSlot {
    triggers: Vec<char>,
    parser: Box<dyn InlineContentParser>,
}

/// Turns the literal text of a leaf block into inline nodes
pub struct InlineParser {
    options: ParserOptions,
    extensions: Vec<ExtensionSlot>,
    triggers: Vec<char>,
}

impl InlineParser {
    pub fn new(options: ParserOptions, factories: &[Arc<dyn InlineContentParserFactory>]) -> Self {
        let extensions: Vec<ExtensionSlot> = factories
            .iter()
            .map(|factory| ExtensionSlot {
                triggers: factory.trigger_characters(),
                parser: factory.create(),
            })
            .collect();
        let mut triggers: Vec<char> = extensions
            .iter()
            .flat_map(|slot| slot.triggers.iter().copied())
            .collect();
        triggers.sort_unstable();
        triggers.dedup();
        InlineParser {
            options,
            extensions,
            triggers,
        }
    }

    /// Parse `content` and append the resulting inline nodes under `parent`
    pub fn parse(&mut self, content: &str, document: &mut Document, parent: NodeId) {
        let mut run = InlineRun {
            input: content,
            pos: 0,
            document,
            parent,
            options: &self.options,
            extensions: &mut self.extensions,
            triggers: &self.triggers,
            delimiters: Vec::new(),
            brackets: Vec::new(),
        };
        run.parse();
    }
}

/// A run of `*`, `_` or `~` that may open or close emphasis
#[derive(Debug, Clone, Copy)]
struct Delimiter {
    node: NodeId,
    ch: char,
    length: usize,
    original_length: usize,
    can_open: bool,
    can_close: bool,
}

/// An opening `[` or `![` waiting for its `]`
#[derive(Debug, Clone, Copy)]
struct Bracket {
    node: NodeId,
    /// Offset just past the opening bracket
    index: usize,
    image: bool,
    active: bool,
    delimiter_bottom: usize,
}

struct InlineRun<'r> {
    input: &'r str,
    pos: usize,
    document: &'r mut Document,
    parent: NodeId,
    options: &'r ParserOptions,
    extensions: &'r mut Vec<ExtensionSlot>,
    triggers: &'r [char],
    delimiters: Vec<Delimiter>,
    brackets: Vec<Bracket>,
}

impl InlineRun<'_> {
    fn parse(&mut self) {
        while let Some(c) = char_at(self.input, self.pos) {
            let handled = match c {
                '\n' => self.parse_line_break(),
                '\\' => self.parse_backslash(),
                '`' => self.parse_backticks(),
                '[' => self.open_bracket(false),
                '!' if self.input.as_bytes().get(self.pos + 1) == Some(&b'[') => {
                    self.open_bracket(true)
                }
                ']' => self.close_bracket(),
                '<' => self.parse_angle_bracket(),
                '&' => self.parse_entity(),
                '*' | '_' => self.parse_delimiters(c),
                '~' if self.options.gfm => self.parse_delimiters(c),
                _ => false,
            };
            if handled {
                continue;
            }
            if self.triggers.contains(&c) && self.try_extensions(c) {
                continue;
            }
            // Always consumes at least one char, so the scan cannot stall
            self.parse_text();
        }
        self.process_emphasis(0);
        merge_text_nodes(self.document, self.parent);
    }

    fn is_special(&self, c: char) -> bool {
        matches!(
            c,
            '\n' | '\\' | '`' | '[' | ']' | '!' | '<' | '&' | '*' | '_'
        ) || (c == '~' && self.options.gfm)
            || self.triggers.contains(&c)
    }

    fn append(&mut self, value: NodeValue) -> NodeId {
        let node = self.document.create_node(value);
        self.document.append_child(self.parent, node);
        node
    }

    fn append_text(&mut self, literal: &str) -> NodeId {
        self.append(NodeValue::Text(literal.to_string()))
    }

    fn parse_text(&mut self) {
        let start = self.pos;
        let mut end = start;
        if let Some(first) = char_at(self.input, end) {
            end += first.len_utf8();
        }
        while let Some(c) = char_at(self.input, end) {
            if self.is_special(c) {
                break;
            }
            end += c.len_utf8();
        }
        self.pos = end;

        let mut text = &self.input[start..end];
        if self.input.as_bytes().get(end) == Some(&b'\n') {
            // Trailing spaces decide the break kind, not the text
            text = text.trim_end_matches(' ');
        }
        if !text.is_empty() {
            self.append_text(text);
        }
    }

    fn parse_line_break(&mut self) -> bool {
        let spaces = self.input.as_bytes()[..self.pos]
            .iter()
            .rev()
            .take_while(|&&b| b == b' ')
            .count();
        self.pos += 1;
        if spaces >= 2 {
            self.append(NodeValue::HardBreak);
        } else {
            self.append(NodeValue::SoftBreak);
        }
        self.skip_line_indent();
        true
    }

    fn skip_line_indent(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && bytes[self.pos] == b' ' {
            self.pos += 1;
        }
    }

    fn parse_backslash(&mut self) -> bool {
        match self.input.as_bytes().get(self.pos + 1) {
            Some(b'\n') => {
                self.pos += 2;
                self.append(NodeValue::HardBreak);
                self.skip_line_indent();
            }
            Some(&b) if b.is_ascii_punctuation() => {
                self.pos += 2;
                self.append(NodeValue::Text((b as char).to_string()));
            }
            _ => {
                self.pos += 1;
                self.append_text("\\");
            }
        }
        true
    }

    fn parse_backticks(&mut self) -> bool {
        match scan_code_span(self.input, self.pos) {
            Some((content, end)) => {
                self.pos = end;
                self.append(NodeValue::Code(content));
            }
            None => {
                // An unmatched run is literal, all of it
                let len = run_length(self.input.as_bytes(), self.pos, b'`');
                let run = &self.input[self.pos..self.pos + len];
                self.pos += len;
                self.append_text(run);
            }
        }
        true
    }

    fn parse_angle_bracket(&mut self) -> bool {
        if let Some((destination, text, end)) = scan_autolink(self.input, self.pos) {
            self.pos = end;
            let link = self.append(NodeValue::Link {
                destination,
                title: None,
            });
            let child = self.document.create_node(NodeValue::Text(text));
            self.document.append_child(link, child);
            return true;
        }
        if !self.options.safe_mode
            && let Some(end) = scan_html_inline(self.input, self.pos)
        {
            let html = self.input[self.pos..end].to_string();
            self.pos = end;
            self.append(NodeValue::HtmlInline(html));
            return true;
        }
        false
    }

    fn parse_entity(&mut self) -> bool {
        match decode_entity(self.input, self.pos) {
            Some((decoded, end)) => {
                self.pos = end;
                self.append(NodeValue::Text(decoded));
                true
            }
            None => false,
        }
    }

    fn parse_delimiters(&mut self, c: char) -> bool {
        let start = self.pos;
        let len = run_length(self.input.as_bytes(), start, c as u8);
        let run = &self.input[start..start + len];
        self.pos += len;
        if c == '~' && len > 2 {
            self.append_text(run);
            return true;
        }

        // Start and end of the block count as whitespace
        let before = char_before(self.input, start).unwrap_or('\n');
        let after = char_at(self.input, start + len).unwrap_or('\n');
        let (before_space, after_space) = (before.is_whitespace(), after.is_whitespace());
        let (before_punct, after_punct) = (is_punctuation(before), is_punctuation(after));
        let left_flanking = !after_space && (!after_punct || before_space || before_punct);
        let right_flanking = !before_space && (!before_punct || after_space || after_punct);

        let (can_open, can_close) = if c == '_' {
            (
                left_flanking && (!right_flanking || before_punct),
                right_flanking && (!left_flanking || after_punct),
            )
        } else {
            (left_flanking, right_flanking)
        };

        let node = self.append_text(run);
        self.delimiters.push(Delimiter {
            node,
            ch: c,
            length: len,
            original_length: len,
            can_open,
            can_close,
        });
        true
    }

    fn open_bracket(&mut self, image: bool) -> bool {
        let marker = if image { "![" } else { "[" };
        let node = self.append_text(marker);
        self.pos += marker.len();
        self.brackets.push(Bracket {
            node,
            index: self.pos,
            image,
            active: true,
            delimiter_bottom: self.delimiters.len(),
        });
        true
    }

    fn close_bracket(&mut self) -> bool {
        let close_pos = self.pos;
        self.pos += 1;

        let Some(opener) = self.brackets.last().copied() else {
            self.append_text("]");
            return true;
        };
        if !opener.active {
            self.brackets.pop();
            self.append_text("]");
            return true;
        }

        let Some((destination, title)) = self.parse_link_target(opener, close_pos) else {
            self.brackets.pop();
            self.append_text("]");
            return true;
        };

        let value = if opener.image {
            NodeValue::Image { destination, title }
        } else {
            NodeValue::Link { destination, title }
        };
        let link = self.document.create_node(value);
        let mut next = self.document.next_sibling(opener.node);
        while let Some(id) = next {
            next = self.document.next_sibling(id);
            self.document.append_child(link, id);
        }
        self.document.append_child(self.parent, link);

        self.process_emphasis(opener.delimiter_bottom);
        self.document.unlink(opener.node);
        self.brackets.pop();

        // Links cannot contain other links
        if !opener.image {
            for bracket in self.brackets.iter_mut().filter(|b| !b.image) {
                bracket.active = false;
            }
        }
        true
    }

    /// Destination and title for the bracket pair closing at `close_pos`:
    /// inline, full reference, collapsed reference, then shortcut.
    /// Moves the cursor past whatever was consumed.
    fn parse_link_target(
        &mut self,
        opener: Bracket,
        close_pos: usize,
    ) -> Option<(String, Option<String>)> {
        let after = close_pos + 1;
        if self.input.as_bytes().get(after) == Some(&b'(')
            && let Some((destination, title, end)) = self.scan_inline_link(after + 1)
        {
            self.pos = end;
            return Some((destination, title));
        }

        let bracket_text = &self.input[opener.index..close_pos];
        let (label, end) = match scan_link_label(self.input, after) {
            Some((label, end)) if label.is_empty() => (bracket_text.to_string(), end),
            Some((label, end)) => (label, end),
            None => (bracket_text.to_string(), after),
        };
        if label.chars().count() > MAX_LABEL_LENGTH {
            return None;
        }
        let reference = self.document.reference(&label)?;
        let target = (reference.destination.clone(), reference.title.clone());
        self.pos = end;
        Some(target)
    }

    /// `(destination "title")` starting just after `(`
    fn scan_inline_link(&self, start: usize) -> Option<(String, Option<String>, usize)> {
        let bytes = self.input.as_bytes();
        let dest_start = skip_spaces_and_newline(self.input, start)?;
        let (destination, after_dest) = scan_link_destination(self.input, dest_start)?;
        let mut i = skip_spaces_and_newline(self.input, after_dest)?;
        let mut title = None;
        if i > after_dest
            && let Some((parsed, end)) = scan_link_title(self.input, i)
        {
            title = Some(parsed);
            i = skip_spaces_and_newline(self.input, end)?;
        }
        (bytes.get(i) == Some(&b')')).then_some((destination, title, i + 1))
    }

    fn try_extensions(&mut self, c: char) -> bool {
        let pos = self.pos;
        let input = self.input;
        let parsed: Option<ParsedInline> = {
            let state = InlineParserState {
                input,
                index: pos,
                document: self.document,
            };
            self.extensions
                .iter_mut()
                .filter(|slot| slot.triggers.contains(&c))
                .find_map(|slot| {
                    let parsed = slot.parser.try_parse(&state)?;
                    if parsed.end <= pos
                        || parsed.end > input.len()
                        || !input.is_char_boundary(parsed.end)
                    {
                        warn!(
                            "inline extension for {:?} did not advance past offset {}",
                            c, pos
                        );
                        return None;
                    }
                    Some(parsed)
                })
        };
        let Some(parsed) = parsed else {
            return false;
        };

        self.pos = parsed.end;
        let node = self.append(parsed.value);
        for child in parsed.children {
            let child = self.document.create_node(child);
            self.document.append_child(node, child);
        }
        true
    }

    fn delimiters_match(opener: &Delimiter, closer: &Delimiter) -> bool {
        if opener.ch == '~' {
            return opener.length == closer.length;
        }
        // Rule of 3 for runs that can both open and close
        let sum = opener.original_length + closer.original_length;
        !((opener.can_close || closer.can_open)
            && sum % 3 == 0
            && !(opener.original_length % 3 == 0 && closer.original_length % 3 == 0))
    }

    fn set_delimiter_text(&mut self, index: usize) {
        let delimiter = self.delimiters[index];
        let literal: String = std::iter::repeat_n(delimiter.ch, delimiter.length).collect();
        *self.document.value_mut(delimiter.node) = NodeValue::Text(literal);
    }

    /// Resolve emphasis among the delimiters above `bottom`, then drop them
    fn process_emphasis(&mut self, bottom: usize) {
        let mut closer_index = bottom;
        while closer_index < self.delimiters.len() {
            let closer = self.delimiters[closer_index];
            if !closer.can_close {
                closer_index += 1;
                continue;
            }

            let opener_index = (bottom..closer_index).rev().find(|&i| {
                let opener = &self.delimiters[i];
                opener.ch == closer.ch
                    && opener.can_open
                    && opener.length > 0
                    && Self::delimiters_match(opener, &closer)
            });
            let Some(opener_index) = opener_index else {
                if closer.can_open {
                    closer_index += 1;
                } else {
                    self.delimiters.remove(closer_index);
                }
                continue;
            };

            let opener = self.delimiters[opener_index];
            let used = if closer.ch == '~' {
                opener.length
            } else if opener.length >= 2 && closer.length >= 2 {
                2
            } else {
                1
            };
            self.delimiters[opener_index].length -= used;
            self.delimiters[closer_index].length -= used;
            self.set_delimiter_text(opener_index);
            self.set_delimiter_text(closer_index);

            let value = match (closer.ch, used) {
                ('~', _) => NodeValue::Strikethrough,
                (_, 2) => NodeValue::Strong,
                _ => NodeValue::Emphasis,
            };
            let emphasis = self.document.create_node(value);
            let mut next = self.document.next_sibling(opener.node);
            while let Some(id) = next {
                if id == closer.node {
                    break;
                }
                next = self.document.next_sibling(id);
                self.document.append_child(emphasis, id);
            }
            self.document.insert_after(opener.node, emphasis);

            // Delimiters inside the new node can no longer match
            self.delimiters.drain(opener_index + 1..closer_index);
            closer_index = opener_index + 1;

            if self.delimiters[opener_index].length == 0 {
                self.document.unlink(opener.node);
                self.delimiters.remove(opener_index);
                closer_index -= 1;
            }
            if self.delimiters[closer_index].length == 0 {
                self.document.unlink(closer.node);
                self.delimiters.remove(closer_index);
            }
        }
        self.delimiters.truncate(bottom);
    }
}

/// Join adjacent text nodes throughout the subtree under `root`
fn merge_text_nodes(document: &mut Document, root: NodeId) {
    let mut stack = vec![root];
    while let Some(parent) = stack.pop() {
        let mut child = document.first_child(parent);
        while let Some(id) = child {
            let mut next = document.next_sibling(id);
            if let NodeValue::Text(_) = document.value(id) {
                while let Some(next_id) = next {
                    let NodeValue::Text(following) = document.value(next_id) else {
                        break;
                    };
                    let following = following.clone();
                    if let NodeValue::Text(text) = document.value_mut(id) {
                        text.push_str(&following);
                    }
                    next = document.next_sibling(next_id);
                    document.unlink(next_id);
                }
            } else {
                stack.push(id);
            }
            child = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    /// Compact s-expression of the inline children of a paragraph
    fn render(document: &Document, node: NodeId) -> String {
        document
            .children(node)
            .map(|child| match document.value(child) {
                NodeValue::Text(t) => format!("{:?}", t),
                NodeValue::Code(c) => format!("(code {:?})", c),
                NodeValue::SoftBreak => "soft".to_string(),
                NodeValue::HardBreak => "hard".to_string(),
                NodeValue::HtmlInline(h) => format!("(html {:?})", h),
                NodeValue::Link { destination, .. } => {
                    format!("(link {} {})", destination, render(document, child))
                }
                NodeValue::Image { destination, .. } => {
                    format!("(img {} {})", destination, render(document, child))
                }
                other => format!("({} {})", other.kind_name(), render(document, child)),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn parse_with(input: &str, options: ParserOptions) -> String {
        let mut document = Document::new();
        let root = document.root();
        let paragraph = document.create_node(NodeValue::Paragraph);
        document.append_child(root, paragraph);
        let mut parser = InlineParser::new(options, &[]);
        parser.parse(input, &mut document, paragraph);
        render(&document, paragraph)
    }

    fn parse(input: &str) -> String {
        parse_with(input, ParserOptions::default())
    }

    #[rstest]
    #[case("*foo bar*", "(emphasis \"foo bar\")")]
    #[case("**foo**", "(strong \"foo\")")]
    #[case("*foo *bar", "\"*foo *bar\"")]
    #[case("a * foo bar*", "\"a * foo bar*\"")]
    #[case("foo*bar*", "\"foo\" (emphasis \"bar\")")]
    #[case("_foo_bar", "\"_foo_bar\"")]
    #[case("***strong emph***", "(emphasis (strong \"strong emph\"))")]
    #[case("*foo**bar**baz*", "(emphasis \"foo\" (strong \"bar\") \"baz\")")]
    #[case("foo***bar***baz", "\"foo\" (emphasis (strong \"bar\")) \"baz\"")]
    #[case("**foo*", "\"*\" (emphasis \"foo\")")]
    #[case("*foo**", "(emphasis \"foo\") \"*\"")]
    fn emphasis(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse(input), expected);
    }

    #[test]
    fn strikethrough_requires_gfm() {
        let gfm = ParserOptions {
            gfm: true,
            ..ParserOptions::default()
        };
        assert_eq!(parse_with("~~hi~~", gfm), "(strikethrough \"hi\")");
        assert_eq!(parse_with("~~~hi~~~", gfm), "\"~~~hi~~~\"");
        assert_eq!(parse_with("~~hi~", gfm), "\"~~hi~\"");
        assert_eq!(parse("~~hi~~"), "\"~~hi~~\"");
    }

    #[rstest]
    #[case("`code` x", "(code \"code\") \" x\"")]
    #[case("``foo`", "\"``foo`\"")]
    #[case("\\*not emph\\*", "\"*not emph*\"")]
    #[case("foo\\\nbar", "\"foo\" hard \"bar\"")]
    #[case("foo  \nbar", "\"foo\" hard \"bar\"")]
    #[case("foo \n  bar", "\"foo\" soft \"bar\"")]
    #[case("&copy; &bogus;", "\"© &bogus;\"")]
    #[case("<http://a.b>", "(link http://a.b \"http://a.b\")")]
    #[case("a <b>c</b>", "\"a \" (html \"<b>\") \"c\" (html \"</b>\")")]
    fn inline_constructs(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse(input), expected);
    }

    #[test]
    fn safe_mode_keeps_html_as_text() {
        let safe = ParserOptions {
            safe_mode: true,
            ..ParserOptions::default()
        };
        assert_eq!(parse_with("a <b>c</b>", safe), "\"a <b>c</b>\"");
    }

    #[rstest]
    #[case("[link](/uri \"title\")", "(link /uri \"link\")")]
    #[case("[link](</my uri>)", "(link /my uri \"link\")")]
    #[case("[link]()", "(link  \"link\")")]
    #[case("[a](<b)c>)", "(link b)c \"a\")")]
    #[case("![foo *bar*](/img)", "(img /img \"foo \" (emphasis \"bar\"))")]
    #[case("[foo [bar](/u)](/v)", "\"[foo \" (link /u \"bar\") \"](/v)\"")]
    #[case("[link] (/uri)", "\"[link] (/uri)\"")]
    #[case("*[foo*](/u)", "\"*\" (link /u \"foo*\")")]
    fn inline_links(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(parse(input), expected);
    }

    #[test]
    fn reference_links_resolve_through_document() {
        let mut document = Document::new();
        document.define_reference(crate::ast::LinkReference {
            label: "Foo Bar".to_string(),
            destination: "/url".to_string(),
            title: Some("t".to_string()),
        });
        let root = document.root();
        let paragraph = document.create_node(NodeValue::Paragraph);
        document.append_child(root, paragraph);
        let mut parser = InlineParser::new(ParserOptions::default(), &[]);
        parser.parse(
            "[x][foo  bar] [foo bar][] [FOO BAR] [x][nope]",
            &mut document,
            paragraph,
        );
        assert_eq!(
            render(&document, paragraph),
            "(link /url \"x\") \" \" (link /url \"foo bar\") \" \" (link /url \"FOO BAR\") \" [x][nope]\""
        );
    }

    struct Never;
    impl InlineContentParser for Never {
        fn try_parse(&mut self, _state: &InlineParserState<'_>) -> Option<ParsedInline> {
            None
        }
    }
    struct NeverFactory;
    impl InlineContentParserFactory for NeverFactory {
        fn trigger_characters(&self) -> Vec<char> {
            vec!['$']
        }
        fn create(&self) -> Box<dyn InlineContentParser> {
            Box::new(Never)
        }
    }

    struct Stuck;
    impl InlineContentParser for Stuck {
        fn try_parse(&mut self, state: &InlineParserState<'_>) -> Option<ParsedInline> {
            Some(ParsedInline::new(NodeValue::Math(String::new()), state.index()))
        }
    }
    struct StuckFactory;
    impl InlineContentParserFactory for StuckFactory {
        fn trigger_characters(&self) -> Vec<char> {
            vec!['$']
        }
        fn create(&self) -> Box<dyn InlineContentParser> {
            Box::new(Stuck)
        }
    }

    #[rstest]
    #[case(Arc::new(NeverFactory))]
    #[case(Arc::new(StuckFactory))]
    fn declining_extension_leaves_text(#[case] factory: Arc<dyn InlineContentParserFactory>) {
        let mut document = Document::new();
        let root = document.root();
        let paragraph = document.create_node(NodeValue::Paragraph);
        document.append_child(root, paragraph);
        let mut parser = InlineParser::new(ParserOptions::default(), &[factory]);
        parser.parse("text $unterminated and $$ more", &mut document, paragraph);
        assert_eq!(
            render(&document, paragraph),
            "\"text $unterminated and $$ more\""
        );
    }
}
