//! Thin helpers over the html5ever `RcDom`.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

pub fn html5_parse(input: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(input)
}

pub fn tag_lower(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.to_string().to_ascii_lowercase()),
        _ => None,
    }
}

pub fn attr_get(node: &Handle, name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|a| a.name.local.to_string().eq_ignore_ascii_case(name))
            .map(|a| a.value.to_string()),
        _ => None,
    }
}

pub fn children(node: &Handle) -> Vec<Handle> {
    node.children.borrow().clone()
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

pub fn has_child_elements(node: &Handle) -> bool {
    node.children.borrow().iter().any(is_element)
}

/// Elements whose content never reaches the document.
pub fn is_skipped_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style" | "noscript" | "template" | "head")
}

/// Children of `<body>`, or of the document root when there is none.
pub fn body_children(dom: &RcDom) -> Vec<Handle> {
    let mut stack = vec![dom.document.clone()];
    while let Some(node) = stack.pop() {
        if tag_lower(&node).as_deref() == Some("body") {
            return children(&node);
        }
        for c in node.children.borrow().iter().rev() {
            stack.push(c.clone());
        }
    }
    children(&dom.document)
}

/// Concatenated text of every text node under `node`, in document order.
/// Skipped elements contribute nothing and `<br>` contributes a newline.
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    let mut stack = vec![node.clone()];
    while let Some(n) = stack.pop() {
        match &n.data {
            NodeData::Text { contents } => out.push_str(&contents.borrow()),
            NodeData::Element { .. } => {
                match tag_lower(&n).as_deref() {
                    Some("br") => {
                        out.push('\n');
                        continue;
                    }
                    Some(t) if is_skipped_tag(t) => continue,
                    _ => {}
                }
                for c in n.children.borrow().iter().rev() {
                    stack.push(c.clone());
                }
            }
            _ => {}
        }
    }
    out
}

pub fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
                in_ws = true;
            }
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}
