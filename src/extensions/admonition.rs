/// MkDocs-style admonitions:
///
/// ```text
/// !!! warning "Mind the gap"
///     Indented content, any blocks.
/// ```
use crate::ast::NodeValue;
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, CODE_BLOCK_INDENT, MatchedBlock,
    ParserState,
};

const MARKER: &str = "!!!";

#[derive(Debug, Clone)]
pub struct AdmonitionBlockParser {
    kind: String,
    title: Option<String>,
}

impl BlockParser for AdmonitionBlockParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::Admonition {
            kind: self.kind.clone(),
            title: self.title.clone(),
        }
    }

    fn is_container(&self) -> bool {
        true
    }

    fn can_contain(&mut self, child: &NodeValue) -> bool {
        !matches!(child, NodeValue::ListItem { .. })
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if state.is_blank() {
            Some(BlockContinue::AtIndex(state.next_non_space_index()))
        } else if state.indent() >= CODE_BLOCK_INDENT {
            Some(BlockContinue::AtColumn(state.column() + CODE_BLOCK_INDENT))
        } else {
            None
        }
    }
}

pub struct AdmonitionBlockParserFactory;

impl BlockParserFactory for AdmonitionBlockParserFactory {
    fn try_start(&self, state: &ParserState<'_>, _matched: MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT {
            return None;
        }
        let (kind, title) = parse_marker_line(state.rest())?;
        let parser = AdmonitionBlockParser { kind, title };
        Some(BlockStart::of(parser).at_index(state.line().len()))
    }
}

/// `!!! kind` with an optional double-quoted title and nothing else
fn parse_marker_line(line: &str) -> Option<(String, Option<String>)> {
    let after = line.strip_prefix(MARKER)?;
    if !after.starts_with([' ', '\t']) {
        return None;
    }
    let after = after.trim_start();
    let kind_len = after
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(after.len());
    if kind_len == 0 {
        return None;
    }
    let kind = after[..kind_len].to_lowercase();

    let rest = after[kind_len..].trim();
    if rest.is_empty() {
        return Some((kind, None));
    }
    let title = rest.strip_prefix('"')?.strip_suffix('"')?;
    if title.contains('"') {
        return None;
    }
    Some((kind, Some(title.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::MarkdownParser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("!!! note", Some(("note", None)))]
    #[case("!!! Warning \"Mind the gap\"", Some(("warning", Some("Mind the gap"))))]
    #[case("!!! tip \"\"", Some(("tip", Some(""))))]
    #[case("!!!note", None)]
    #[case("!!! ", None)]
    #[case("!!! note title", None)]
    #[case("!! note", None)]
    fn marker_lines(#[case] line: &str, #[case] expected: Option<(&str, Option<&str>)>) {
        let parsed = parse_marker_line(line);
        assert_eq!(
            parsed.as_ref().map(|(k, t)| (k.as_str(), t.as_deref())),
            expected
        );
    }

    #[test]
    fn indented_content_belongs_to_the_admonition() {
        let parser = MarkdownParser::builder()
            .block_parser_factory(AdmonitionBlockParserFactory)
            .build();
        let document = parser.parse("!!! note \"Heads up\"\n    first\n\n    - item\n\nafter\n");
        let blocks: Vec<_> = document.root_node().children().collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(
            blocks[0].value(),
            &NodeValue::Admonition {
                kind: "note".to_string(),
                title: Some("Heads up".to_string())
            }
        );
        let inner: Vec<&str> = blocks[0]
            .children()
            .map(|node| node.value().kind_name())
            .collect();
        assert_eq!(inner, vec!["paragraph", "list"]);
        assert_eq!(blocks[1].text_content(), "after");
    }
}
