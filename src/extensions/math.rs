/// `$x^2$` inline math
use crate::ast::NodeValue;
use crate::parser::inline::extension::{
    InlineContentParser, InlineContentParserFactory, InlineParserState, ParsedInline,
};

pub struct InlineMathParserFactory;

impl InlineContentParserFactory for InlineMathParserFactory {
    fn trigger_characters(&self) -> Vec<char> {
        vec!['$']
    }

    fn create(&self) -> Box<dyn InlineContentParser> {
        Box::new(InlineMathParser)
    }
}

struct InlineMathParser;

impl InlineContentParser for InlineMathParser {
    fn try_parse(&mut self, state: &InlineParserState<'_>) -> Option<ParsedInline> {
        let rest = state.rest();
        let body = rest.strip_prefix('$')?;
        // Content must hug both dollars: `$ x $` and `$$` stay text
        if body.starts_with(|c: char| c.is_whitespace() || c == '$') {
            return None;
        }

        let bytes = body.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'$' => {
                    let literal = &body[..i];
                    if literal.ends_with(char::is_whitespace) {
                        return None;
                    }
                    let end = state.index() + 1 + i + 1;
                    return Some(ParsedInline::new(NodeValue::Math(literal.to_string()), end));
                }
                _ => i += 1,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::NodeValue;
    use crate::parser::MarkdownParser;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::InlineMathParserFactory;

    fn inlines(input: &str) -> Vec<NodeValue> {
        let parser = MarkdownParser::builder()
            .inline_parser_factory(InlineMathParserFactory)
            .build();
        let document = parser.parse(input);
        let paragraph = document.root_node().first_child().unwrap();
        paragraph.children().map(|node| node.value().clone()).collect()
    }

    fn text(s: &str) -> NodeValue {
        NodeValue::Text(s.to_string())
    }

    #[rstest]
    #[case("$x^2$", vec![NodeValue::Math("x^2".to_string())])]
    #[case("a $b$ c", vec![text("a "), NodeValue::Math("b".to_string()), text(" c")])]
    #[case("$\\$$", vec![NodeValue::Math("\\$".to_string())])]
    #[case("$ x $", vec![text("$ x $")])]
    #[case("costs $5", vec![text("costs $5")])]
    #[case("$", vec![text("$")])]
    #[case("$$", vec![text("$$")])]
    fn math_spans(#[case] input: &str, #[case] expected: Vec<NodeValue>) {
        assert_eq!(inlines(input), expected);
    }
}
