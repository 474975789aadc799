/// GFM extended autolinks: bare `www.`, `http://` and `https://` links
use crate::ast::NodeValue;
use crate::parser::inline::extension::{
    InlineContentParser, InlineContentParserFactory, InlineParserState, ParsedInline,
};

const SCHEMES: [&str; 2] = ["http://", "https://"];

pub struct ExtendedAutolinkParserFactory;

impl InlineContentParserFactory for ExtendedAutolinkParserFactory {
    fn trigger_characters(&self) -> Vec<char> {
        vec!['h', 'w']
    }

    fn create(&self) -> Box<dyn InlineContentParser> {
        Box::new(ExtendedAutolinkParser)
    }
}

struct ExtendedAutolinkParser;

impl InlineContentParser for ExtendedAutolinkParser {
    fn try_parse(&mut self, state: &InlineParserState<'_>) -> Option<ParsedInline> {
        let at_boundary = match state.previous_char() {
            None => true,
            Some(c) => c.is_whitespace() || matches!(c, '*' | '_' | '~' | '('),
        };
        if !at_boundary {
            return None;
        }

        let rest = state.rest();
        let (prefix, destination_prefix) = if rest.starts_with("www.") {
            ("www.", "http://")
        } else {
            (SCHEMES.iter().copied().find(|scheme| rest.starts_with(scheme))?, "")
        };

        let candidate_len = rest
            .find(|c: char| c.is_whitespace() || c == '<')
            .unwrap_or(rest.len());
        let link = trim_link_end(&rest[..candidate_len]);
        // Trimming may eat into the prefix itself, as in `www.`
        if !valid_domain(link.get(prefix.len()..)?) {
            return None;
        }

        let destination = format!("{}{}", destination_prefix, link);
        let value = NodeValue::Link {
            destination,
            title: None,
        };
        Some(
            ParsedInline::new(value, state.index() + link.len())
                .with_children(vec![NodeValue::Text(link.to_string())]),
        )
    }
}

/// Drop trailing punctuation and any `)` without a matching `(`
fn trim_link_end(link: &str) -> &str {
    let mut link = link;
    loop {
        let trimmed = link.trim_end_matches(['?', '!', '.', ',', ':', '*', '_', '~', '\'', '"']);
        if let Some(without_paren) = trimmed.strip_suffix(')') {
            let opens = trimmed.matches('(').count();
            let closes = trimmed.matches(')').count();
            if closes > opens {
                link = without_paren;
                continue;
            }
        }
        return trimmed;
    }
}

/// Domain segments of alphanumerics, `-` and `_`, with no `_` in the last
/// two segments
fn valid_domain(rest: &str) -> bool {
    let domain_len = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let domain = &rest[..domain_len];
    if domain.is_empty() {
        return false;
    }
    let segments: Vec<&str> = domain.split('.').collect();
    if segments.iter().any(|segment| {
        segment.is_empty()
            || !segment
                .chars()
                .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    }) {
        return false;
    }
    !segments.iter().rev().take(2).any(|segment| segment.contains('_'))
}
