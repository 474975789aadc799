/// AST node types and the arena-backed document tree
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use unicode_casefold::UnicodeCaseFold;

/// Handle to a node stored in a [`Document`].
///
/// Handles stay valid for the lifetime of the document that issued them,
/// including after the node has been unlinked from the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeValue {
    Document,
    // Container blocks
    BlockQuote,
    List {
        kind: ListKind,
        tight: bool, // Tight lists don't wrap item paragraphs
    },
    ListItem {
        task: Option<bool>, // GFM task marker: Some(checked)
    },
    Table {
        alignments: Vec<Alignment>,
    },
    TableHead,
    TableBody,
    TableRow,
    Admonition {
        kind: String,
        title: Option<String>,
    },
    CustomBlock {
        name: String,
        literal: String,
    },
    // Leaf blocks
    Paragraph,
    Heading {
        level: u8,
        setext: bool,
        id: Option<String>,
    },
    CodeBlock {
        fenced: bool,
        info: String,
        literal: String,
    },
    HtmlBlock(String), // Raw HTML block (passed through unchanged)
    ThematicBreak,
    TableCell {
        header: bool,
        alignment: Alignment,
    },
    // Inline nodes
    Text(String),
    SoftBreak,
    HardBreak,
    Code(String), // Inline code span
    HtmlInline(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        destination: String,
        title: Option<String>,
    },
    Image {
        destination: String,
        title: Option<String>,
    },
    Math(String),
    CustomInline {
        name: String,
        literal: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListKind {
    Bullet(char),
    Ordered { start: u32, delimiter: char },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    None,
    Left,
    Right,
    Center,
}

impl NodeValue {
    /// Block-level nodes, containers and leaves alike
    pub fn is_block(&self) -> bool {
        self.is_container() || self.is_leaf_block()
    }

    /// Blocks that hold other blocks
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            NodeValue::Document
                | NodeValue::BlockQuote
                | NodeValue::List { .. }
                | NodeValue::ListItem { .. }
                | NodeValue::Table { .. }
                | NodeValue::TableHead
                | NodeValue::TableBody
                | NodeValue::TableRow
                | NodeValue::Admonition { .. }
                | NodeValue::CustomBlock { .. }
        )
    }

    /// Blocks that hold only inline content or literal text
    pub fn is_leaf_block(&self) -> bool {
        matches!(
            self,
            NodeValue::Paragraph
                | NodeValue::Heading { .. }
                | NodeValue::CodeBlock { .. }
                | NodeValue::HtmlBlock(_)
                | NodeValue::ThematicBreak
                | NodeValue::TableCell { .. }
        )
    }

    pub fn is_inline(&self) -> bool {
        !self.is_block()
    }

    /// Short name of the variant, used in diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeValue::Document => "document",
            NodeValue::BlockQuote => "block_quote",
            NodeValue::List { .. } => "list",
            NodeValue::ListItem { .. } => "list_item",
            NodeValue::Table { .. } => "table",
            NodeValue::TableHead => "table_head",
            NodeValue::TableBody => "table_body",
            NodeValue::TableRow => "table_row",
            NodeValue::Admonition { .. } => "admonition",
            NodeValue::CustomBlock { .. } => "custom_block",
            NodeValue::Paragraph => "paragraph",
            NodeValue::Heading { .. } => "heading",
            NodeValue::CodeBlock { .. } => "code_block",
            NodeValue::HtmlBlock(_) => "html_block",
            NodeValue::ThematicBreak => "thematic_break",
            NodeValue::TableCell { .. } => "table_cell",
            NodeValue::Text(_) => "text",
            NodeValue::SoftBreak => "soft_break",
            NodeValue::HardBreak => "hard_break",
            NodeValue::Code(_) => "code",
            NodeValue::HtmlInline(_) => "html_inline",
            NodeValue::Emphasis => "emphasis",
            NodeValue::Strong => "strong",
            NodeValue::Strikethrough => "strikethrough",
            NodeValue::Link { .. } => "link",
            NodeValue::Image { .. } => "image",
            NodeValue::Math(_) => "math",
            NodeValue::CustomInline { .. } => "custom_inline",
        }
    }
}

/// A link reference definition: `[label]: destination "title"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub label: String,
    pub destination: String,
    pub title: Option<String>,
}

/// Normalize a link label for matching: trim, collapse internal whitespace
/// runs to a single space and apply Unicode case folding.
pub fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .case_fold()
        .collect()
}

#[derive(Debug, Clone)]
struct NodeData {
    value: NodeValue,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// A parsed Markdown document.
///
/// Nodes live in an arena owned by the document. Each node owns its ordered
/// children through first/last child links; parent and sibling links are
/// plain handles, so attaching and detaching never copies a subtree.
/// The document also owns the link reference table.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    references: Table<LinkReference>,
    heading_ids: Table<usize>,
}

impl Document {
    pub fn new() -> Self {
        let mut document = Document {
            nodes: Vec::new(),
            references: Table::default(),
            heading_ids: Table::default(),
        };
        document.create_node(NodeValue::Document);
        document
    }

    /// The root `Document` node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn root_node(&self) -> NodeRef<'_> {
        self.node(self.root())
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { document: self, id }
    }

    /// Allocate a detached node
    pub fn create_node(&mut self, value: NodeValue) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            value,
            parent: None,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
        });
        id
    }

    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.nodes[id.0].value
    }

    pub fn value_mut(&mut self, id: NodeId) -> &mut NodeValue {
        &mut self.nodes[id.0].value
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            document: self,
            next: self.first_child(id),
        }
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root()
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Attach `child` as the last child of `parent`, detaching it from any
    /// previous position first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(!self.is_ancestor_or_self(child, parent), "cycle in tree");
        self.unlink(child);
        let last = self.nodes[parent.0].last_child;
        {
            let data = &mut self.nodes[child.0];
            data.parent = Some(parent);
            data.prev = last;
        }
        match last {
            Some(last) => self.nodes[last.0].next = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        self.nodes[parent.0].last_child = Some(child);
    }

    /// Attach `child` as the first child of `parent`
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(!self.is_ancestor_or_self(child, parent), "cycle in tree");
        self.unlink(child);
        let first = self.nodes[parent.0].first_child;
        {
            let data = &mut self.nodes[child.0];
            data.parent = Some(parent);
            data.next = first;
        }
        match first {
            Some(first) => self.nodes[first.0].prev = Some(child),
            None => self.nodes[parent.0].last_child = Some(child),
        }
        self.nodes[parent.0].first_child = Some(child);
    }

    /// Place `sibling` directly after `node` under the same parent
    pub fn insert_after(&mut self, node: NodeId, sibling: NodeId) {
        debug_assert!(!self.is_ancestor_or_self(sibling, node), "cycle in tree");
        self.unlink(sibling);
        let parent = self.nodes[node.0].parent;
        let next = self.nodes[node.0].next;
        {
            let data = &mut self.nodes[sibling.0];
            data.parent = parent;
            data.prev = Some(node);
            data.next = next;
        }
        match next {
            Some(next) => self.nodes[next.0].prev = Some(sibling),
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = Some(sibling);
                }
            }
        }
        self.nodes[node.0].next = Some(sibling);
    }

    /// Detach a node from its parent and siblings. The node keeps its own
    /// children and becomes the root of a detached subtree.
    pub fn unlink(&mut self, node: NodeId) {
        let (parent, prev, next) = {
            let data = &self.nodes[node.0];
            (data.parent, data.prev, data.next)
        };
        match prev {
            Some(prev) => self.nodes[prev.0].next = next,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.nodes[next.0].prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.nodes[parent.0].last_child = prev;
                }
            }
        }
        let data = &mut self.nodes[node.0];
        data.parent = None;
        data.prev = None;
        data.next = None;
    }

    /// Look up a reference definition by label (normalized before lookup)
    pub fn reference(&self, label: &str) -> Option<&LinkReference> {
        self.references.get(&normalize_label(label))
    }

    /// Register a definition. The first definition of a normalized label
    /// wins; returns false when the label was already defined.
    pub fn define_reference(&mut self, reference: LinkReference) -> bool {
        let key = normalize_label(&reference.label);
        if key.is_empty() || self.references.get(&key).is_some() {
            return false;
        }
        self.references.insert(key, reference);
        true
    }

    pub fn references(&self) -> impl Iterator<Item = &LinkReference> {
        self.references.values()
    }

    /// Hand out a heading id unique within this document
    pub(crate) fn unique_heading_id(&mut self, slug: String) -> String {
        let count = self.heading_ids.get(&slug).copied().unwrap_or(0);
        let id = if count == 0 {
            slug.clone()
        } else {
            format!("{}-{}", slug, count)
        };
        self.heading_ids.insert(slug, count + 1);
        id
    }

    /// Fresh document that reads this one's reference and heading-id
    /// tables without copying them. Its own additions stay local.
    pub(crate) fn fork_tables(&self) -> Document {
        let mut document = Document::new();
        document.references = self.references.fork();
        document.heading_ids = self.heading_ids.fork();
        document
    }

    #[cfg(test)]
    pub(crate) fn shares_tables_with(&self, other: &Document) -> bool {
        self.references.shares_base_with(&other.references)
            && self.heading_ids.shares_base_with(&other.heading_ids)
    }
}

/// Map keyed by normalized strings, cheap to fork.
///
/// A forked table reads the shared base and writes to a local overlay, so
/// forking costs nothing however large the base is. An unforked table
/// writes through to the base, which is only copied if a fork is alive.
#[derive(Debug, Clone)]
struct Table<V> {
    base: Arc<HashMap<String, V>>,
    overlay: HashMap<String, V>,
    forked: bool,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Table {
            base: Arc::new(HashMap::new()),
            overlay: HashMap::new(),
            forked: false,
        }
    }
}

impl<V: Clone> Table<V> {
    fn get(&self, key: &str) -> Option<&V> {
        self.overlay.get(key).or_else(|| self.base.get(key))
    }

    fn insert(&mut self, key: String, value: V) {
        if self.forked {
            self.overlay.insert(key, value);
        } else {
            Arc::make_mut(&mut self.base).insert(key, value);
        }
    }

    /// Values, overlay entries shadowing base entries with the same key
    fn values(&self) -> impl Iterator<Item = &V> {
        self.overlay.values().chain(
            self.base
                .iter()
                .filter(|(key, _)| !self.overlay.contains_key(*key))
                .map(|(_, value)| value),
        )
    }

    fn fork(&self) -> Table<V> {
        Table {
            base: Arc::clone(&self.base),
            overlay: self.overlay.clone(),
            forked: true,
        }
    }

    #[cfg(test)]
    fn shares_base_with(&self, other: &Table<V>) -> bool {
        Arc::ptr_eq(&self.base, &other.base)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root_node().serialize(serializer)
    }
}

pub struct Children<'a> {
    document: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.document.next_sibling(current);
        Some(current)
    }
}

/// Borrowed view of one node and its subtree
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    document: &'a Document,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn value(&self) -> &'a NodeValue {
        self.document.value(self.id)
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.document.parent(self.id).map(|id| self.document.node(id))
    }

    pub fn first_child(&self) -> Option<NodeRef<'a>> {
        self.document
            .first_child(self.id)
            .map(|id| self.document.node(id))
    }

    pub fn last_child(&self) -> Option<NodeRef<'a>> {
        self.document
            .last_child(self.id)
            .map(|id| self.document.node(id))
    }

    pub fn next_sibling(&self) -> Option<NodeRef<'a>> {
        self.document
            .next_sibling(self.id)
            .map(|id| self.document.node(id))
    }

    pub fn previous_sibling(&self) -> Option<NodeRef<'a>> {
        self.document
            .previous_sibling(self.id)
            .map(|id| self.document.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let document = self.document;
        document.children(self.id).map(move |id| document.node(id))
    }

    /// Pre-order traversal of this node and everything below it
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            document: self.document,
            stack: vec![self.id],
        }
    }

    /// Concatenated literal text of the subtree, with line breaks as spaces
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        for node in self.descendants() {
            match node.value() {
                NodeValue::Text(literal)
                | NodeValue::Code(literal)
                | NodeValue::Math(literal) => text.push_str(literal),
                NodeValue::CustomInline { literal, .. } => text.push_str(literal),
                NodeValue::SoftBreak | NodeValue::HardBreak => text.push(' '),
                _ => {}
            }
        }
        text
    }

    /// Dispatch to the visitor method for this node's variant
    pub fn accept<V: Visitor + ?Sized>(self, visitor: &mut V) {
        match self.value() {
            NodeValue::Document => visitor.visit_document(self),
            NodeValue::BlockQuote => visitor.visit_block_quote(self),
            NodeValue::List { .. } => visitor.visit_list(self),
            NodeValue::ListItem { .. } => visitor.visit_list_item(self),
            NodeValue::Table { .. } => visitor.visit_table(self),
            NodeValue::TableHead => visitor.visit_table_head(self),
            NodeValue::TableBody => visitor.visit_table_body(self),
            NodeValue::TableRow => visitor.visit_table_row(self),
            NodeValue::TableCell { .. } => visitor.visit_table_cell(self),
            NodeValue::Admonition { .. } => visitor.visit_admonition(self),
            NodeValue::CustomBlock { .. } => visitor.visit_custom_block(self),
            NodeValue::Paragraph => visitor.visit_paragraph(self),
            NodeValue::Heading { .. } => visitor.visit_heading(self),
            NodeValue::CodeBlock { .. } => visitor.visit_code_block(self),
            NodeValue::HtmlBlock(_) => visitor.visit_html_block(self),
            NodeValue::ThematicBreak => visitor.visit_thematic_break(self),
            NodeValue::Text(_) => visitor.visit_text(self),
            NodeValue::SoftBreak => visitor.visit_soft_break(self),
            NodeValue::HardBreak => visitor.visit_hard_break(self),
            NodeValue::Code(_) => visitor.visit_code(self),
            NodeValue::HtmlInline(_) => visitor.visit_html_inline(self),
            NodeValue::Emphasis => visitor.visit_emphasis(self),
            NodeValue::Strong => visitor.visit_strong(self),
            NodeValue::Strikethrough => visitor.visit_strikethrough(self),
            NodeValue::Link { .. } => visitor.visit_link(self),
            NodeValue::Image { .. } => visitor.visit_image(self),
            NodeValue::Math(_) => visitor.visit_math(self),
            NodeValue::CustomInline { .. } => visitor.visit_custom_inline(self),
        }
    }
}

impl Serialize for NodeRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let children: Vec<NodeRef<'_>> = self.children().collect();
        let mut state = serializer.serialize_struct("Node", 2)?;
        state.serialize_field("value", self.value())?;
        state.serialize_field("children", &children)?;
        state.end()
    }
}

pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<NodeRef<'a>> {
        let id = self.stack.pop()?;
        let mut child = self.document.last_child(id);
        while let Some(c) = child {
            self.stack.push(c);
            child = self.document.previous_sibling(c);
        }
        Some(self.document.node(id))
    }
}

/// One method per node variant. Every method defaults to visiting the
/// node's children, so implementors override only what they render.
pub trait Visitor {
    fn visit_children(&mut self, node: NodeRef<'_>) {
        for child in node.children() {
            child.accept(self);
        }
    }

    fn visit_document(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_block_quote(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_list(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_list_item(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_table(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_table_head(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_table_body(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_table_row(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_table_cell(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_admonition(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_custom_block(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_paragraph(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_heading(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_code_block(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_html_block(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_thematic_break(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_text(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_soft_break(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_hard_break(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_code(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_html_inline(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_emphasis(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_strong(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_strikethrough(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_link(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_image(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_math(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
    fn visit_custom_inline(&mut self, node: NodeRef<'_>) {
        self.visit_children(node)
    }
}
