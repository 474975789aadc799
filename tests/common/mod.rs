#![allow(dead_code)]

use streamark::ast::ListKind;
use streamark::{Document, NodeRef, NodeValue, StreamSink, Visitor};

/// Compact one-line rendering of a tree, e.g. `para["a " em["b"]]`
#[derive(Default)]
pub struct Dump {
    out: String,
}

impl Dump {
    fn separate(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('[') {
            self.out.push(' ');
        }
    }

    fn leaf(&mut self, label: String) {
        self.separate();
        self.out.push_str(&label);
    }

    fn group(&mut self, label: &str, node: NodeRef<'_>) {
        self.separate();
        self.out.push_str(label);
        if node.first_child().is_some() {
            self.out.push('[');
            for child in node.children() {
                child.accept(self);
            }
            self.out.push(']');
        }
    }
}

impl Visitor for Dump {
    fn visit_children(&mut self, node: NodeRef<'_>) {
        self.group(node.value().kind_name(), node);
    }

    fn visit_document(&mut self, node: NodeRef<'_>) {
        for child in node.children() {
            child.accept(self);
        }
    }

    fn visit_paragraph(&mut self, node: NodeRef<'_>) {
        self.group("para", node);
    }

    fn visit_heading(&mut self, node: NodeRef<'_>) {
        if let NodeValue::Heading { level, .. } = node.value() {
            self.group(&format!("h{}", level), node);
        }
    }

    fn visit_block_quote(&mut self, node: NodeRef<'_>) {
        self.group("quote", node);
    }

    fn visit_list(&mut self, node: NodeRef<'_>) {
        if let NodeValue::List { kind, tight } = node.value() {
            let mut label = match kind {
                ListKind::Bullet(c) => format!("ul({})", c),
                ListKind::Ordered { start, delimiter } => format!("ol({}{})", start, delimiter),
            };
            if !tight {
                label.push_str("+loose");
            }
            self.group(&label, node);
        }
    }

    fn visit_list_item(&mut self, node: NodeRef<'_>) {
        let label = match node.value() {
            NodeValue::ListItem { task: Some(true) } => "done",
            NodeValue::ListItem { task: Some(false) } => "todo",
            _ => "li",
        };
        self.group(label, node);
    }

    fn visit_code_block(&mut self, node: NodeRef<'_>) {
        if let NodeValue::CodeBlock { info, literal, .. } = node.value() {
            self.leaf(format!("code_block({:?} {:?})", info, literal));
        }
    }

    fn visit_html_block(&mut self, node: NodeRef<'_>) {
        if let NodeValue::HtmlBlock(html) = node.value() {
            self.leaf(format!("html_block({:?})", html));
        }
    }

    fn visit_table_cell(&mut self, node: NodeRef<'_>) {
        self.group("td", node);
    }

    fn visit_text(&mut self, node: NodeRef<'_>) {
        if let NodeValue::Text(text) = node.value() {
            self.leaf(format!("{:?}", text));
        }
    }

    fn visit_soft_break(&mut self, _node: NodeRef<'_>) {
        self.leaf("soft".to_string());
    }

    fn visit_hard_break(&mut self, _node: NodeRef<'_>) {
        self.leaf("hard".to_string());
    }

    fn visit_code(&mut self, node: NodeRef<'_>) {
        if let NodeValue::Code(code) = node.value() {
            self.leaf(format!("code({:?})", code));
        }
    }

    fn visit_html_inline(&mut self, node: NodeRef<'_>) {
        if let NodeValue::HtmlInline(html) = node.value() {
            self.leaf(format!("html({:?})", html));
        }
    }

    fn visit_math(&mut self, node: NodeRef<'_>) {
        if let NodeValue::Math(math) = node.value() {
            self.leaf(format!("math({:?})", math));
        }
    }

    fn visit_emphasis(&mut self, node: NodeRef<'_>) {
        self.group("em", node);
    }

    fn visit_strong(&mut self, node: NodeRef<'_>) {
        self.group("strong", node);
    }

    fn visit_strikethrough(&mut self, node: NodeRef<'_>) {
        self.group("del", node);
    }

    fn visit_link(&mut self, node: NodeRef<'_>) {
        if let NodeValue::Link { destination, title } = node.value() {
            self.group(&resource_label("link", destination, title.as_deref()), node);
        }
    }

    fn visit_image(&mut self, node: NodeRef<'_>) {
        if let NodeValue::Image { destination, title } = node.value() {
            self.group(&resource_label("img", destination, title.as_deref()), node);
        }
    }
}

fn resource_label(name: &str, destination: &str, title: Option<&str>) -> String {
    match title {
        Some(title) => format!("{}({} {:?})", name, destination, title),
        None => format!("{}({})", name, destination),
    }
}

pub fn dump_node(node: NodeRef<'_>) -> String {
    let mut dump = Dump::default();
    node.accept(&mut dump);
    dump.out
}

pub fn dump(document: &Document) -> String {
    dump_node(document.root_node())
}

/// Every parent, child and sibling link agrees with its counterpart
pub fn assert_well_formed(document: &Document) {
    for node in document.root_node().descendants() {
        let id = node.id();
        let children: Vec<_> = document.children(id).collect();
        assert_eq!(document.first_child(id), children.first().copied());
        assert_eq!(document.last_child(id), children.last().copied());
        for (i, &child) in children.iter().enumerate() {
            assert_eq!(document.parent(child), Some(id));
            let previous = i.checked_sub(1).map(|p| children[p]);
            assert_eq!(document.previous_sibling(child), previous);
            assert_eq!(document.next_sibling(child), children.get(i + 1).copied());
        }
    }
    assert_eq!(document.parent(document.root()), None);
}

/// Sink that records every call as a dumped line
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<String>,
}

impl RecordingSink {
    /// Final content only: rendered leaves and container brackets
    pub fn committed(&self) -> Vec<&str> {
        self.events
            .iter()
            .map(String::as_str)
            .filter(|event| !event.starts_with("preview") && *event != "clear")
            .collect()
    }

    /// Rendered leaves only
    pub fn rendered(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| event.strip_prefix("render "))
            .map(str::to_string)
            .collect()
    }
}

impl StreamSink for RecordingSink {
    fn open_block(&mut self, node: NodeRef<'_>) {
        self.events.push(format!("open {}", node.value().kind_name()));
    }

    fn close_block(&mut self, node: NodeRef<'_>) {
        self.events.push(format!("close {}", node.value().kind_name()));
    }

    fn render_node(&mut self, node: NodeRef<'_>) {
        self.events.push(format!("render {}", dump_node(node)));
    }

    fn render_preview_node(&mut self, node: NodeRef<'_>) {
        self.events.push(format!("preview {}", dump_node(node)));
    }

    fn clear_preview(&mut self) {
        self.events.push("clear".to_string());
    }
}

/// Blocks a stream reports through `render_node`, in document order, from
/// a batch parse. A table is reported whole.
pub fn leaf_blocks(document: &Document) -> Vec<String> {
    document
        .root_node()
        .descendants()
        .filter(|node| match node.value() {
            NodeValue::Table { .. } => true,
            NodeValue::TableCell { .. } => false,
            value => value.is_leaf_block(),
        })
        .map(dump_node)
        .collect()
}
