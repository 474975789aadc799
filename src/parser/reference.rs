/// Link reference definitions at the start of paragraph text
use crate::ast::LinkReference;
use crate::parser::inline::scan::{
    scan_link_destination, scan_link_label, scan_link_title, skip_spaces_and_newline,
};

/// Parse one definition at the start of `input`. Returns the definition and
/// the byte length it occupies, including its line terminator.
pub fn parse_reference(input: &str) -> Option<(LinkReference, usize)> {
    let bytes = input.as_bytes();
    let mut pos = skip_leading_spaces(input, 0);
    if pos > 3 || bytes.get(pos) != Some(&b'[') {
        return None;
    }

    let (label, after_label) = scan_link_label(input, pos)?;
    if label.trim().is_empty() || bytes.get(after_label) != Some(&b':') {
        return None;
    }
    pos = skip_spaces_and_newline(input, after_label + 1)?;

    let (destination, after_destination) = scan_link_destination(input, pos)?;
    // A bare destination may not be empty; `<>` is allowed
    if after_destination == pos {
        return None;
    }
    let definition_end = line_end_if_blank(input, after_destination);

    let title = skip_spaces_and_newline(input, after_destination).and_then(|title_start| {
        if title_start == after_destination {
            return None;
        }
        let (title, after_title) = scan_link_title(input, title_start)?;
        line_end_if_blank(input, after_title).map(|end| (title, end))
    });

    let (title, end) = match (title, definition_end) {
        (Some((title, end)), _) => (Some(title), end),
        (None, Some(end)) => (None, end),
        (None, None) => return None,
    };

    Some((
        LinkReference {
            label,
            destination,
            title,
        },
        end,
    ))
}

/// Strip every leading definition from paragraph text, returning them and
/// the remaining text
pub fn split_references(content: &str) -> (Vec<LinkReference>, &str) {
    let mut references = Vec::new();
    let mut rest = content;
    while let Some((reference, len)) = parse_reference(rest) {
        references.push(reference);
        rest = &rest[len..];
    }
    (references, rest)
}

fn skip_leading_spaces(input: &str, mut pos: usize) -> usize {
    let bytes = input.as_bytes();
    while pos < bytes.len() && bytes[pos] == b' ' {
        pos += 1;
    }
    pos
}

/// If only spaces/tabs remain before the end of the line, the offset just
/// past the line terminator
fn line_end_if_blank(input: &str, pos: usize) -> Option<usize> {
    let bytes = input.as_bytes();
    let mut i = pos;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    match bytes.get(i) {
        None => Some(i),
        Some(b'\n') => Some(i + 1),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("[foo]: /url \"title\"", "/url", Some("title"))]
    #[case("[foo]:\n/url\n'the title'", "/url", Some("the title"))]
    #[case("[foo]: <my url> (t)", "my url", Some("t"))]
    #[case("[foo]: /url", "/url", None)]
    #[case("   [foo]: /f&ouml;&ouml;", "/föö", None)]
    #[case("[foo]: <>", "", None)]
    fn parses_definition(#[case] input: &str, #[case] destination: &str, #[case] title: Option<&str>) {
        let (reference, len) = parse_reference(input).unwrap();
        assert_eq!(reference.destination, destination);
        assert_eq!(reference.title.as_deref(), title);
        assert_eq!(len, input.len());
    }

    #[rstest]
    #[case("[foo]:")]
    #[case("[]: /url")]
    #[case("    [foo]: /url")]
    #[case("[foo] /url")]
    #[case("[foo]: /url \"title\" ok")]
    #[case("[foo]: <bar>(baz)")]
    fn rejects_malformed(#[case] input: &str) {
        assert!(parse_reference(input).is_none());
    }

    #[test]
    fn title_on_next_line_falls_back_to_bare_definition() {
        let input = "[foo]: /url\n\"title\" ok";
        let (reference, len) = parse_reference(input).unwrap();
        assert_eq!(reference.title, None);
        assert_eq!(&input[len..], "\"title\" ok");
    }

    #[test]
    fn split_keeps_following_text() {
        let (references, rest) = split_references("[a]: /a\n[b]: /b\nsome text");
        assert_eq!(references.len(), 2);
        assert_eq!(references[1].label, "b");
        assert_eq!(rest, "some text");
    }
}
