mod common;

use common::{RecordingSink, dump, leaf_blocks};
use pretty_assertions::assert_eq;
use rstest::rstest;
use streamark::MarkdownParser;
use streamark::extensions::{AdmonitionBlockParserFactory, InlineMathParserFactory};

const KITCHEN_SINK: &str = "\
# Streaming *markdown*

[home]: https://example.com \"Home\"

A paragraph with a [link][home], `code`, and
a lazy second line.

> quoted
continued lazily
>
> - nested item
>   more text

1. first

2. second
   - [x] done
   - [ ] open

```rust
fn main() {
    println!(\"hi\");
}
```

| left | right |
| :--- | ----: |
| a    | b     |
| c \\| d | $e$ |

<div>
raw *html*
</div>

!!! note \"Heads up\"
    Inside the admonition with $x^2$.

    Still inside.

Setext heading
--------------

    indented code

***
Final line without newline ~~done~~ www.example.com";

fn parser() -> MarkdownParser {
    MarkdownParser::builder()
        .gfm(true)
        .generate_heading_ids(true)
        .block_parser_factory(AdmonitionBlockParserFactory)
        .inline_parser_factory(InlineMathParserFactory)
        .build()
}

fn stream_in_chunks(input: &str, chunks: &[&str]) -> (String, RecordingSink) {
    assert_eq!(chunks.concat(), input);
    let mut stream = parser().stream(RecordingSink::default());
    for chunk in chunks {
        stream.push(chunk);
    }
    let (document, sink) = stream.close();
    (dump(&document), sink)
}

/// Split on char boundaries into pieces of `size` chars
fn chunks_of(input: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    chars
        .chunks(size)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Previews are withdrawn before anything final is reported
fn assert_preview_ordering(events: &[String]) {
    let mut preview_shown = false;
    for (i, event) in events.iter().enumerate() {
        if event.starts_with("preview") {
            preview_shown = true;
        } else if event == "clear" {
            assert!(preview_shown, "clear without a preview at event {}", i);
            preview_shown = false;
        } else {
            assert!(
                !preview_shown,
                "{:?} delivered while a preview was shown (event {})",
                event, i
            );
        }
    }
    assert!(!preview_shown, "preview left on screen after close");
}

/// Every `open` has a matching `close` of the same kind, properly nested
fn assert_balanced(events: &[String]) {
    let mut stack = Vec::new();
    for event in events {
        if let Some(kind) = event.strip_prefix("open ") {
            stack.push(kind);
        } else if let Some(kind) = event.strip_prefix("close ") {
            assert_eq!(stack.pop(), Some(kind));
        }
    }
    assert!(stack.is_empty(), "unclosed containers: {:?}", stack);
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(7)]
#[case(16)]
#[case(10_000)]
fn chunk_size_does_not_change_the_result(#[case] size: usize) {
    let _ = env_logger::builder().is_test(true).try_init();
    let batch = parser().parse(KITCHEN_SINK);
    let chunks = chunks_of(KITCHEN_SINK, size);
    let chunk_refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
    let (streamed, sink) = stream_in_chunks(KITCHEN_SINK, &chunk_refs);

    assert_eq!(streamed, dump(&batch));
    assert_eq!(sink.rendered(), leaf_blocks(&batch));
    assert_preview_ordering(&sink.events);
    assert_balanced(&sink.events);
}

#[test]
fn every_two_way_split_matches_batch() {
    let input = "> a\n> b\n\n- x\n- y\n\n```\ncode\n```\ntail *em*";
    let batch = parser().parse(input);
    let expected = leaf_blocks(&batch);
    for (split, _) in input.char_indices().skip(1) {
        let (streamed, sink) = stream_in_chunks(input, &[&input[..split], &input[split..]]);
        assert_eq!(streamed, dump(&batch), "split at {}", split);
        assert_eq!(sink.rendered(), expected, "split at {}", split);
        assert_preview_ordering(&sink.events);
    }
}

#[test]
fn crlf_input_matches_lf_input() {
    let lf = "# Title\n\n- a\n- b\n\ntext\n";
    let crlf = lf.replace('\n', "\r\n");
    let (from_lf, _) = stream_in_chunks(lf, &[lf]);
    let pieces = chunks_of(&crlf, 1);
    let piece_refs: Vec<&str> = pieces.iter().map(String::as_str).collect();
    let (from_crlf, _) = stream_in_chunks(&crlf, &piece_refs);
    assert_eq!(from_crlf, from_lf);
}

#[test]
fn list_items_are_previewed_until_final() {
    let (_, sink) = stream_in_chunks("- a\n- b", &["- a\n- b"]);
    assert_eq!(
        sink.events,
        vec![
            "open list",
            "open list_item",
            r#"preview li[para["a"]]"#,
            r#"preview li[para["b"]]"#,
            "clear",
            r#"render para["a"]"#,
            "close list_item",
            "open list_item",
            r#"render para["b"]"#,
            "close list_item",
            "close list",
        ]
    );
}

#[test]
fn code_block_preview_grows_with_each_token() {
    let (_, sink) = stream_in_chunks("```\nlet x", &["```\n", "let", " x"]);
    assert_eq!(
        sink.events,
        vec![
            r#"preview code_block("" "let\n")"#,
            "clear",
            r#"preview code_block("" "let x\n")"#,
            "clear",
            r#"render code_block("" "let x\n")"#,
        ]
    );
}

#[test]
fn setext_underline_replaces_the_paragraph_preview() {
    let (_, sink) = stream_in_chunks("Title\n--", &["Title\n", "--"]);
    assert_eq!(
        sink.events,
        vec![
            r#"preview h2["Title"]"#,
            "clear",
            r#"render h2["Title"]"#,
        ]
    );
}

#[test]
fn committed_events_do_not_depend_on_previews() {
    let input = "> quote\n\npara\n";
    let (_, whole) = stream_in_chunks(input, &[input]);
    let pieces = chunks_of(input, 1);
    let piece_refs: Vec<&str> = pieces.iter().map(String::as_str).collect();
    let (_, tokenwise) = stream_in_chunks(input, &piece_refs);
    assert_eq!(tokenwise.committed(), whole.committed());
    assert_eq!(
        whole.committed(),
        vec![
            "open block_quote",
            r#"render para["quote"]"#,
            "close block_quote",
            r#"render para["para"]"#,
        ]
    );
}

#[test]
fn streams_are_independent() {
    let parser = parser();
    let mut first = parser.stream(RecordingSink::default());
    let mut second = parser.stream(RecordingSink::default());
    first.push("[a]: /one\n\n");
    second.push("[a]\n");
    let (second_doc, _) = second.close();
    let (first_doc, _) = first.close();
    assert_eq!(dump(&second_doc), r#"para["[a]"]"#);
    assert_eq!(first_doc.reference("A").map(|r| r.destination.as_str()), Some("/one"));
}

#[test]
fn empty_stream_reports_nothing() {
    let (document, sink) = stream_in_chunks("", &[]);
    assert_eq!(document, "");
    assert!(sink.events.is_empty());
}
