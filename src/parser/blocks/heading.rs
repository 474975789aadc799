/// ATX (`# Title`) and setext (`Title\n===`) headings
use crate::ast::{Document, NodeId, NodeValue};
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, CODE_BLOCK_INDENT, MatchedBlock,
    ParserState,
};
use crate::parser::inline::InlineParser;

#[derive(Debug, Clone)]
pub struct HeadingParser {
    level: u8,
    setext: bool,
    content: String,
    generate_id: bool,
}

impl BlockParser for HeadingParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::Heading {
            level: self.level,
            setext: self.setext,
            id: None,
        }
    }

    fn try_continue(&mut self, _state: &ParserState<'_>) -> Option<BlockContinue> {
        // Headings are always a single line
        None
    }

    fn parse_inlines(&mut self, inline: &mut InlineParser, document: &mut Document, node: NodeId) {
        inline.parse(&self.content, document, node);
        if self.generate_id {
            let slug = slugify(&document.node(node).text_content());
            let unique = document.unique_heading_id(slug);
            if let NodeValue::Heading { id, .. } = document.value_mut(node) {
                *id = Some(unique);
            }
        }
    }
}

pub struct HeadingParserFactory;

impl BlockParserFactory for HeadingParserFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let generate_id = state.options().generate_heading_ids;
        let rest = state.rest();

        if let Some((level, content)) = parse_atx_heading(rest) {
            let parser = HeadingParser {
                level,
                setext: false,
                content: content.to_string(),
                generate_id,
            };
            return Some(BlockStart::of(parser).at_index(state.line().len()));
        }

        let level = setext_level(rest)?;
        if !matches!(matched.value(), NodeValue::Paragraph) {
            return None;
        }
        let content = matched.paragraph_content()?;
        let content = content.trim_end();
        if content.is_empty() {
            return None;
        }
        let parser = HeadingParser {
            level,
            setext: true,
            content: content.to_string(),
            generate_id,
        };
        Some(
            BlockStart::of(parser)
                .at_index(state.line().len())
                .replace_active_block_parser(),
        )
    }
}

/// Level and content of an ATX heading line, closing sequence removed
fn parse_atx_heading(line: &str) -> Option<(u8, &str)> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let after = &line[level..];
    if !(after.is_empty() || after.starts_with(' ')) {
        return None;
    }

    let content = after.trim();
    let without_closing = content.trim_end_matches('#');
    if without_closing.is_empty() {
        return Some((level as u8, ""));
    }
    if without_closing.ends_with(' ') {
        return Some((level as u8, without_closing.trim_end()));
    }
    Some((level as u8, content))
}

/// `=` underline is level 1, `-` is level 2
fn setext_level(line: &str) -> Option<u8> {
    let underline = line.trim_end();
    let first = underline.bytes().next()?;
    if !underline.bytes().all(|b| b == first) {
        return None;
    }
    match first {
        b'=' => Some(1),
        b'-' => Some(2),
        _ => None,
    }
}

/// Lowercased alphanumerics with whitespace and dashes collapsed to `-`
pub(crate) fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("# foo", Some((1, "foo")))]
    #[case("###### foo", Some((6, "foo")))]
    #[case("####### foo", None)]
    #[case("#5 bolt", None)]
    #[case("## foo ##", Some((2, "foo")))]
    #[case("# foo#", Some((1, "foo#")))]
    #[case("### foo \\###", Some((3, "foo \\###")))]
    #[case("## ", Some((2, "")))]
    #[case("### ###", Some((3, "")))]
    #[case("#", Some((1, "")))]
    fn atx(#[case] line: &str, #[case] expected: Option<(u8, &str)>) {
        assert_eq!(parse_atx_heading(line), expected);
    }

    #[rstest]
    #[case("===", Some(1))]
    #[case("-   ", Some(2))]
    #[case("= =", None)]
    #[case("--- a", None)]
    fn setext(#[case] line: &str, #[case] expected: Option<u8>) {
        assert_eq!(setext_level(line), expected);
    }

    #[rstest]
    #[case("Hello World", "hello-world")]
    #[case("  Déjà vu -- again!", "déjà-vu-again")]
    #[case("C++ & Rust", "c-rust")]
    #[case("!!!", "section")]
    fn slugs(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(slugify(text), expected);
    }
}
