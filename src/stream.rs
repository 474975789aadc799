//! Incremental parsing for text that arrives in pieces.
//!
//! Designed for chat interfaces where markdown arrives token by token and
//! needs to be rendered progressively. Complete lines go through the same
//! block engine as a batch parse; the unterminated tail is parsed on a
//! throwaway copy of the open blocks and offered as a preview.

use crate::ast::{Document, NodeId, NodeRef};
use crate::parser::engine::{BlockEvent, DocumentParser, Registry};
use crate::parser::split_lines;
use log::{debug, trace};
use std::sync::Arc;

/// Receives the structure of a document as it becomes final.
///
/// Containers are bracketed by `open_block`/`close_block`; leaf blocks are
/// delivered once, complete, through `render_node`. A node passed to
/// `render_node` or `close_block` never changes afterwards.
pub trait StreamSink {
    fn open_block(&mut self, node: NodeRef<'_>);

    fn close_block(&mut self, node: NodeRef<'_>);

    fn render_node(&mut self, node: NodeRef<'_>);

    /// Speculative rendering of the unterminated last line, together with
    /// the committed content of the block it belongs to. Replaced by the
    /// next preview or withdrawn by `clear_preview`.
    ///
    /// Preview nodes are the children of the deepest open block the partial
    /// line leaves in place. When the partial line would close open
    /// containers, as a new sibling list item does, those containers are
    /// previewed again as copies alongside the new block. A sink should draw
    /// the preview in place of that parent's open children rather than
    /// after them.
    fn render_preview_node(&mut self, _node: NodeRef<'_>) {}

    /// Withdraw the nodes passed to `render_preview_node` since the last
    /// clear. Always called before the events that supersede them.
    fn clear_preview(&mut self) {}
}

/// Streaming driver over one document
pub struct StreamMarkdownParser<S: StreamSink> {
    engine: DocumentParser,
    sink: S,
    pending: String,
    preview_shown: bool,
}

impl<S: StreamSink> StreamMarkdownParser<S> {
    pub(crate) fn new(registry: Arc<Registry>, sink: S) -> Self {
        StreamMarkdownParser {
            engine: DocumentParser::new(registry, true),
            sink,
            pending: String::new(),
            preview_shown: false,
        }
    }

    /// Feed the next piece of text. Chunk boundaries may fall anywhere,
    /// including inside a `\r\n` pair.
    pub fn push(&mut self, chunk: &str) {
        self.pending.push_str(chunk);
        if let Some(last_newline) = self.pending.rfind('\n') {
            let tail = self.pending.split_off(last_newline + 1);
            let complete = std::mem::replace(&mut self.pending, tail);
            for line in split_lines(&complete) {
                self.engine.feed_line(line);
                self.dispatch_events();
            }
        }
        self.update_preview();
    }

    /// Flush the unterminated last line, close every open block and hand
    /// back the finished document and the sink
    pub fn close(mut self) -> (Document, S) {
        self.clear_preview();
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.engine.feed_line(line.strip_suffix('\r').unwrap_or(&line));
            self.dispatch_events();
        }
        self.engine.close_all();
        self.dispatch_events();
        debug!(
            "stream closed after {} lines, {} link references",
            self.engine.line_count(),
            self.engine.document().references().count()
        );
        (self.engine.into_document(), self.sink)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The committed tree so far; open blocks hold only finished content
    pub fn document(&self) -> &Document {
        self.engine.document()
    }

    fn clear_preview(&mut self) {
        if self.preview_shown {
            self.sink.clear_preview();
            self.preview_shown = false;
        }
    }

    fn dispatch_events(&mut self) {
        let events = self.engine.take_events();
        if events.is_empty() {
            return;
        }
        self.clear_preview();
        let document = self.engine.document();
        for event in events {
            match event {
                BlockEvent::Opened(id) => self.sink.open_block(document.node(id)),
                BlockEvent::Closed(id) => self.sink.close_block(document.node(id)),
                // Paragraphs made only of reference definitions are dropped
                BlockEvent::Rendered(id) if document.is_attached(id) => {
                    self.sink.render_node(document.node(id))
                }
                BlockEvent::Rendered(_) => {}
            }
        }
    }

    fn update_preview(&mut self) {
        self.clear_preview();
        if self.pending.is_empty() {
            return;
        }
        let line = self.pending.strip_suffix('\r').unwrap_or(&self.pending);
        let (mut scratch, before) = self.engine.snapshot();
        scratch.feed_line(line);
        let after = scratch.open_nodes();
        scratch.close_all();

        let leaf_open = !self.engine.is_open_container(before.len() - 1);
        let document = scratch.document();
        let parent = preview_parent(document, &before, &after, leaf_open);
        let nodes: Vec<NodeId> = document.children(parent).collect();
        trace!("preview of {} nodes", nodes.len());
        for id in nodes {
            self.sink.render_preview_node(document.node(id));
            self.preview_shown = true;
        }
    }
}

/// The open block whose scratch children make up the preview.
///
/// A snapshot copies only open blocks, so every child of the returned node
/// is either a copy of an open block or was started by the partial line.
fn preview_parent(
    document: &Document,
    before: &[NodeId],
    after: &[NodeId],
    leaf_open: bool,
) -> NodeId {
    let mut common = before
        .iter()
        .zip(after)
        .take_while(|(a, b)| a == b)
        .count();
    if leaf_open && common == before.len() && common == after.len() {
        // The partial line extends the open leaf
        common -= 1;
    }
    common
        .checked_sub(1)
        .and_then(|depth| before.get(depth).copied())
        .unwrap_or_else(|| document.root())
}
