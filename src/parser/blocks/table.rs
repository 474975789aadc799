/// GFM pipe tables
use crate::ast::{Alignment, Document, NodeId, NodeValue};
use crate::parser::block::{
    BlockContinue, BlockParser, BlockParserFactory, BlockStart, CODE_BLOCK_INDENT, MatchedBlock,
    ParserState, is_blank,
};
use crate::parser::inline::InlineParser;

#[derive(Debug, Clone)]
pub struct TableParser {
    alignments: Vec<Alignment>,
    header: String,
    rows: Vec<String>,
}

impl BlockParser for TableParser {
    fn create_block(&self) -> NodeValue {
        NodeValue::Table {
            alignments: self.alignments.clone(),
        }
    }

    fn try_continue(&mut self, state: &ParserState<'_>) -> Option<BlockContinue> {
        if !state.is_blank() && state.line().contains('|') {
            Some(BlockContinue::AtIndex(state.index()))
        } else {
            None
        }
    }

    fn add_line(&mut self, line: &str) {
        if !is_blank(line) {
            self.rows.push(line.to_string());
        }
    }

    fn parse_inlines(&mut self, inline: &mut InlineParser, document: &mut Document, node: NodeId) {
        let head = document.create_node(NodeValue::TableHead);
        document.append_child(node, head);
        let header = split_row(&self.header);
        self.append_row(inline, document, head, &header, true);

        if self.rows.is_empty() {
            return;
        }
        let body = document.create_node(NodeValue::TableBody);
        document.append_child(node, body);
        for row in &self.rows {
            let cells = split_row(row);
            self.append_row(inline, document, body, &cells, false);
        }
    }
}

impl TableParser {
    /// Rows are padded or truncated to the header's column count
    fn append_row(
        &self,
        inline: &mut InlineParser,
        document: &mut Document,
        parent: NodeId,
        cells: &[String],
        header: bool,
    ) {
        let row = document.create_node(NodeValue::TableRow);
        document.append_child(parent, row);
        for (column, alignment) in self.alignments.iter().enumerate() {
            let cell = document.create_node(NodeValue::TableCell {
                header,
                alignment: *alignment,
            });
            document.append_child(row, cell);
            if let Some(content) = cells.get(column).filter(|c| !c.is_empty()) {
                inline.parse(content, document, cell);
            }
        }
    }
}

pub struct TableParserFactory;

impl BlockParserFactory for TableParserFactory {
    fn try_start(&self, state: &ParserState<'_>, matched: MatchedBlock<'_>) -> Option<BlockStart> {
        if state.indent() >= CODE_BLOCK_INDENT || !matches!(matched.value(), NodeValue::Paragraph) {
            return None;
        }
        let header = matched.paragraph_content()?;
        if header.is_empty() || header.contains('\n') || !header.contains('|') {
            return None;
        }
        let alignments = parse_delimiter_row(state.rest())?;
        if split_row(&header).len() != alignments.len() {
            return None;
        }
        let parser = TableParser {
            alignments,
            header,
            rows: Vec::new(),
        };
        Some(
            BlockStart::of(parser)
                .at_index(state.line().len())
                .replace_active_block_parser(),
        )
    }
}

/// Alignments from a `| :-- | :-: | --: |` row
fn parse_delimiter_row(line: &str) -> Option<Vec<Alignment>> {
    if !line.contains('|') {
        return None;
    }
    let cells = split_row(line);
    if cells.is_empty() {
        return None;
    }
    cells
        .iter()
        .map(|cell| {
            let left = cell.starts_with(':');
            let right = cell.ends_with(':') && cell.len() > 1;
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            if dashes.is_empty() || !dashes.bytes().all(|b| b == b'-') {
                return None;
            }
            Some(match (left, right) {
                (true, true) => Alignment::Center,
                (true, false) => Alignment::Left,
                (false, true) => Alignment::Right,
                (false, false) => Alignment::None,
            })
        })
        .collect()
}

/// Cells of a row split on unescaped pipes, outer pipes dropped, trimmed.
/// `\|` becomes a literal pipe, inside code spans too.
fn split_row(line: &str) -> Vec<String> {
    let mut row = line.trim();
    if let Some(stripped) = row.strip_prefix('|') {
        row = stripped;
    }
    if row.ends_with('|') && !row.ends_with("\\|") {
        row = &row[..row.len() - 1];
    }

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = row.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('|') => cell.push('|'),
                Some(next) => {
                    cell.push('\\');
                    cell.push(next);
                }
                None => cell.push('\\'),
            },
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            _ => cell.push(c),
        }
    }
    cells.push(cell.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("| a | b |", vec!["a", "b"])]
    #[case("a | b", vec!["a", "b"])]
    #[case("|a|", vec!["a"])]
    #[case("| `\\|` | x |", vec!["`|`", "x"])]
    #[case("| a |  |", vec!["a", ""])]
    fn rows(#[case] line: &str, #[case] expected: Vec<&str>) {
        assert_eq!(split_row(line), expected);
    }

    #[rstest]
    #[case("| --- | :-- | --: | :-: |", Some(vec![Alignment::None, Alignment::Left, Alignment::Right, Alignment::Center]))]
    #[case("---|---", Some(vec![Alignment::None, Alignment::None]))]
    #[case("| -x- |", None)]
    #[case("| : |", None)]
    #[case("hello", None)]
    fn delimiter_rows(#[case] line: &str, #[case] expected: Option<Vec<Alignment>>) {
        assert_eq!(parse_delimiter_row(line), expected);
    }
}
