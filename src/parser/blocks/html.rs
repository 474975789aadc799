/// Raw HTML blocks: the seven start conditions and their end conditions
use crate::ast::{Document, NodeId, NodeValue};
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, CODE_BLOCK_INDENT, MatchedBlock,
    ParserState, is_blank,
};
use crate::parser::inline::scan::scan_html_inline;

const RAW_TEXT_TAGS: [&str; 4] = ["pre", "script", "style", "textarea"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "search", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

#[derive(Debug, Clone)]
pub struct HtmlBlockParser {
    block_type: u8,
    finished: bool,
    lines: Vec<String>,
}

impl BlockParser for HtmlBlockParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::HtmlBlock(String::new())
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if self.finished {
            return None;
        }
        // Types 6 and 7 end at a blank line
        if state.is_blank() && self.block_type >= 6 {
            return None;
        }
        Some(BlockContinue::AtIndex(state.index()))
    }

    fn add_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
        if meets_end_condition(line, self.block_type) {
            self.finished = true;
        }
    }

    fn close_block(&mut self, document: &mut Document, node: NodeId) {
        let html = self.lines.join("\n") + "\n";
        *document.value_mut(node) = NodeValue::HtmlBlock(html);
    }
}

pub struct HtmlBlockParserFactory;

impl BlockParserFactory for HtmlBlockParserFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT || state.next_char() != Some('<') {
            return None;
        }
        let block_type = html_block_type(state.rest())?;
        // Type 7 cannot interrupt a paragraph, not even a lazy one
        if block_type == 7
            && (matches!(matched.value(), NodeValue::Paragraph)
                || matches!(state.active_block(), NodeValue::Paragraph))
        {
            return None;
        }
        let parser = HtmlBlockParser {
            block_type,
            finished: false,
            lines: Vec::new(),
        };
        Some(BlockStart::of(parser).at_index(state.index()))
    }
}

/// Check if a line starts an HTML block (returns the block type 1-7)
fn html_block_type(line: &str) -> Option<u8> {
    let lower = line.to_ascii_lowercase();

    if RAW_TEXT_TAGS
        .iter()
        .any(|tag| tag_starts(&lower, &format!("<{}", tag), false))
    {
        return Some(1);
    }
    if line.starts_with("<!--") {
        return Some(2);
    }
    if line.starts_with("<?") {
        return Some(3);
    }
    if line.starts_with("<!") && line[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Some(4);
    }
    if line.starts_with("<![CDATA[") {
        return Some(5);
    }
    if BLOCK_TAGS.iter().any(|tag| {
        tag_starts(&lower, &format!("<{}", tag), true) || tag_starts(&lower, &format!("</{}", tag), true)
    }) {
        return Some(6);
    }
    if is_complete_tag_line(line) {
        return Some(7);
    }
    None
}

/// `prefix` followed by whitespace, `>`, end of line, or `/>` when allowed
fn tag_starts(line: &str, prefix: &str, allow_self_close: bool) -> bool {
    let Some(after) = line.strip_prefix(prefix) else {
        return false;
    };
    after.is_empty()
        || after.starts_with(['>', ' ', '\t'])
        || (allow_self_close && after.starts_with("/>"))
}

/// A single complete open or closing tag followed only by whitespace
fn is_complete_tag_line(line: &str) -> bool {
    let bytes = line.as_bytes();
    let is_tag = match bytes.get(1) {
        Some(b'/') => bytes.get(2).is_some_and(|b| b.is_ascii_alphabetic()),
        Some(b) => b.is_ascii_alphabetic(),
        None => false,
    };
    if !is_tag {
        return false;
    }
    match scan_html_inline(line, 0) {
        Some(end) => is_blank(&line[end..]),
        None => false,
    }
}

fn meets_end_condition(line: &str, block_type: u8) -> bool {
    match block_type {
        1 => {
            let lower = line.to_ascii_lowercase();
            RAW_TEXT_TAGS
                .iter()
                .any(|tag| lower.contains(&format!("</{}>", tag)))
        }
        2 => line.contains("-->"),
        3 => line.contains("?>"),
        4 => line.contains('>'),
        5 => line.contains("]]>"),
        _ => false,
    }
}
