use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::dom::{
    attr_get, body_children, collapse_ws, has_child_elements, is_skipped_tag, tag_lower,
    text_content,
};
use crate::runs::{extract_runs, runs_text, TextRun};
use crate::style::StyleState;

/// Format-agnostic shape of one logical HTML block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredNode {
    Heading { level: u8, runs: Vec<TextRun> },
    /// `text` is the element's whitespace-collapsed text, used when `runs`
    /// came out empty.
    Paragraph { runs: Vec<TextRun>, text: String },
    List { ordered: bool, items: Vec<Vec<TextRun>> },
    Group { children: Vec<StructuredNode> },
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
        _ => None,
    }
}

fn is_container(tag: &str) -> bool {
    matches!(
        tag,
        "section"
            | "main"
            | "article"
            | "div"
            | "header"
            | "footer"
            | "nav"
            | "aside"
            | "figure"
            | "blockquote"
    )
}

fn is_structural(tag: &str) -> bool {
    heading_level(tag).is_some() || matches!(tag, "p" | "ul" | "ol")
}

/// Elements that never merge with neighbouring inline content.
fn is_standalone(tag: &str) -> bool {
    matches!(
        tag,
        "pre"
            | "table"
            | "hr"
            | "li"
            | "dl"
            | "dt"
            | "dd"
            | "address"
            | "details"
            | "summary"
            | "form"
            | "fieldset"
            | "figcaption"
            | "center"
    )
}

/// Classifies the body of a parsed document into structured nodes.
pub fn structure_document(dom: &RcDom, max_depth: usize) -> Vec<StructuredNode> {
    Classifier { max_depth }.classify_children(&body_children(dom), &StyleState::default(), 0)
}

/// Classifies one element, starting from a fresh style state.
///
/// `node` must belong to a live `RcDom`: dropping the dom clears every
/// node's children, and a detached handle classifies as an empty paragraph.
pub fn classify_element(node: &Handle, max_depth: usize) -> StructuredNode {
    Classifier { max_depth }.classify(node, &StyleState::default(), 0)
}

struct Classifier {
    max_depth: usize,
}

impl Classifier {
    fn run_budget(&self, depth: usize) -> usize {
        self.max_depth.saturating_sub(depth)
    }

    fn classify(&self, node: &Handle, inherited: &StyleState, depth: usize) -> StructuredNode {
        let tag = tag_lower(node).unwrap_or_default();
        if depth >= self.max_depth {
            return self.paragraph(node, inherited, depth);
        }

        if let Some(level) = heading_level(&tag) {
            return StructuredNode::Heading {
                level,
                runs: extract_runs(node, inherited, self.run_budget(depth)),
            };
        }

        match tag.as_str() {
            "p" => self.paragraph(node, inherited, depth),
            "ul" | "ol" => {
                let local = local_state(node, &tag, inherited);
                let items = node
                    .children
                    .borrow()
                    .iter()
                    .filter(|c| tag_lower(c).as_deref() == Some("li"))
                    .map(|li| extract_runs(li, &local, self.run_budget(depth + 1)))
                    .collect();
                StructuredNode::List {
                    ordered: tag == "ol",
                    items,
                }
            }
            t if is_container(t) => {
                if !has_child_elements(node) {
                    return self.paragraph(node, inherited, depth);
                }
                let local = local_state(node, &tag, inherited);
                let kids = node.children.borrow().clone();
                StructuredNode::Group {
                    children: self.classify_children(&kids, &local, depth + 1),
                }
            }
            _ => {
                let blocks = self.structural_descendants(node, depth);
                if blocks.is_empty() {
                    return self.paragraph(node, inherited, depth);
                }
                let local = local_state(node, &tag, inherited);
                StructuredNode::Group {
                    children: blocks
                        .iter()
                        .map(|(b, d)| self.classify(b, &local, *d))
                        .collect(),
                }
            }
        }
    }

    /// Classifies a sibling list. Consecutive text nodes and inline elements
    /// are gathered into one paragraph placed between the block siblings.
    fn classify_children(
        &self,
        nodes: &[Handle],
        inherited: &StyleState,
        depth: usize,
    ) -> Vec<StructuredNode> {
        let mut out = Vec::new();
        let mut pending: Vec<TextRun> = Vec::new();

        for node in nodes {
            match &node.data {
                NodeData::Text { .. } => {
                    pending.extend(extract_runs(node, inherited, 0));
                }
                NodeData::Element { .. } => {
                    let Some(tag) = tag_lower(node) else { continue };
                    if is_skipped_tag(&tag) {
                        continue;
                    }
                    if self.is_inline(node, &tag, depth) {
                        pending.extend(extract_runs(node, inherited, self.run_budget(depth)));
                        continue;
                    }
                    flush_inline(&mut out, &mut pending);
                    out.push(self.classify(node, inherited, depth));
                }
                _ => {}
            }
        }

        flush_inline(&mut out, &mut pending);
        out
    }

    fn is_inline(&self, node: &Handle, tag: &str, depth: usize) -> bool {
        !(is_structural(tag) || is_container(tag) || is_standalone(tag))
            && self.structural_descendants(node, depth).is_empty()
    }

    /// Outermost heading, paragraph and list elements below `node`, with the
    /// depth each one sits at.
    fn structural_descendants(&self, node: &Handle, depth: usize) -> Vec<(Handle, usize)> {
        let mut found = Vec::new();
        let mut stack: Vec<(Handle, usize)> = node
            .children
            .borrow()
            .iter()
            .rev()
            .map(|c| (c.clone(), depth + 1))
            .collect();

        while let Some((n, d)) = stack.pop() {
            if d >= self.max_depth {
                continue;
            }
            let Some(tag) = tag_lower(&n) else { continue };
            if is_skipped_tag(&tag) {
                continue;
            }
            if is_structural(&tag) {
                found.push((n, d));
                continue;
            }
            for c in n.children.borrow().iter().rev() {
                stack.push((c.clone(), d + 1));
            }
        }

        found
    }

    fn paragraph(&self, node: &Handle, inherited: &StyleState, depth: usize) -> StructuredNode {
        StructuredNode::Paragraph {
            runs: extract_runs(node, inherited, self.run_budget(depth)),
            text: collapse_ws(&text_content(node)).trim().to_string(),
        }
    }
}

fn local_state(node: &Handle, tag: &str, inherited: &StyleState) -> StyleState {
    inherited.for_element(tag, attr_get(node, "style").as_deref())
}

fn flush_inline(out: &mut Vec<StructuredNode>, pending: &mut Vec<TextRun>) {
    if pending.is_empty() {
        return;
    }
    let runs = std::mem::take(pending);
    let text = collapse_ws(&runs_text(&runs)).trim().to_string();
    out.push(StructuredNode::Paragraph { runs, text });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::html5_parse;

    fn structure(html: &str) -> Vec<StructuredNode> {
        structure_document(&html5_parse(html), 256)
    }

    fn texts(runs: &[TextRun]) -> Vec<&str> {
        runs.iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn heading_and_paragraph() {
        let nodes = structure("<h1>Title</h1><p>Hello <b>world</b></p>");
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            StructuredNode::Heading { level, runs } => {
                assert_eq!(*level, 1);
                assert_eq!(texts(runs), vec!["Title"]);
            }
            other => panic!("expected heading, got {other:?}"),
        }
        match &nodes[1] {
            StructuredNode::Paragraph { runs, .. } => {
                assert_eq!(texts(runs), vec!["Hello ", "world"]);
                assert!(!runs[0].style.bold);
                assert!(runs[1].style.bold);
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn unordered_and_ordered_lists() {
        let nodes = structure("<ul><li>A</li><li>B</li></ul><ol><li>one</li></ol>");
        match &nodes[0] {
            StructuredNode::List { ordered, items } => {
                assert!(!ordered);
                assert_eq!(items.len(), 2);
                assert_eq!(texts(&items[0]), vec!["A"]);
                assert_eq!(texts(&items[1]), vec!["B"]);
            }
            other => panic!("expected list, got {other:?}"),
        }
        assert!(matches!(&nodes[1], StructuredNode::List { ordered: true, items } if items.len() == 1));
    }

    #[test]
    fn all_heading_levels() {
        let nodes = structure("<h2>b</h2><h3>c</h3><h4>d</h4><h5>e</h5><h6>f</h6>");
        let levels: Vec<u8> = nodes
            .iter()
            .filter_map(|n| match n {
                StructuredNode::Heading { level, .. } => Some(*level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn containers_become_groups() {
        let nodes = structure("<section><h2>S</h2><div><p>inner</p></div></section>");
        let StructuredNode::Group { children } = &nodes[0] else {
            panic!("expected group");
        };
        assert!(matches!(children[0], StructuredNode::Heading { level: 2, .. }));
        let StructuredNode::Group { children: inner } = &children[1] else {
            panic!("expected nested group");
        };
        assert!(matches!(inner[0], StructuredNode::Paragraph { .. }));
    }

    #[test]
    fn leaf_container_is_a_paragraph() {
        let nodes = structure("<div>just text</div>");
        assert!(matches!(&nodes[0], StructuredNode::Paragraph { text, .. } if text == "just text"));
        let nodes = structure("<div></div>");
        assert!(matches!(&nodes[0], StructuredNode::Paragraph { runs, text } if runs.is_empty() && text.is_empty()));
    }

    #[test]
    fn other_elements_with_structure_inside() {
        let nodes = structure("<table><tr><td><p>cell</p></td><td><h3>h</h3></td></tr></table>");
        let StructuredNode::Group { children } = &nodes[0] else {
            panic!("expected group");
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(children[0], StructuredNode::Paragraph { .. }));
        assert!(matches!(children[1], StructuredNode::Heading { level: 3, .. }));
    }

    #[test]
    fn other_elements_without_structure_are_paragraphs() {
        let nodes = structure("<pre>let x = 1;</pre>");
        assert!(matches!(&nodes[0], StructuredNode::Paragraph { text, .. } if text == "let x = 1;"));
    }

    #[test]
    fn mixed_content_keeps_document_order() {
        let nodes = structure("<div>lead <b>in</b><h2>Head</h2>tail</div>");
        let StructuredNode::Group { children } = &nodes[0] else {
            panic!("expected group");
        };
        assert_eq!(children.len(), 3);
        match &children[0] {
            StructuredNode::Paragraph { runs, text } => {
                assert_eq!(texts(runs), vec!["lead ", "in"]);
                assert!(runs[1].style.bold);
                assert_eq!(text, "lead in");
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
        assert!(matches!(children[1], StructuredNode::Heading { level: 2, .. }));
        assert!(matches!(&children[2], StructuredNode::Paragraph { text, .. } if text == "tail"));
    }

    #[test]
    fn bare_body_text_is_a_paragraph() {
        let nodes = structure("plain words");
        assert_eq!(nodes.len(), 1);
        assert!(matches!(&nodes[0], StructuredNode::Paragraph { text, .. } if text == "plain words"));
    }

    #[test]
    fn container_style_reaches_children() {
        let nodes = structure(r#"<div style="font-style: italic"><p>x</p></div>"#);
        let StructuredNode::Group { children } = &nodes[0] else {
            panic!("expected group");
        };
        let StructuredNode::Paragraph { runs, .. } = &children[0] else {
            panic!("expected paragraph");
        };
        assert!(runs[0].style.italic);
    }

    #[test]
    fn depth_limit_degrades_to_paragraph() {
        let html = format!("{}<p>deep</p>{}", "<div>".repeat(20), "</div>".repeat(20));
        let dom = html5_parse(&html);
        let nodes = structure_document(&dom, 4);
        fn find_paragraph_text(nodes: &[StructuredNode]) -> Option<String> {
            for n in nodes {
                match n {
                    StructuredNode::Paragraph { text, .. } => return Some(text.clone()),
                    StructuredNode::Group { children } => {
                        if let Some(t) = find_paragraph_text(children) {
                            return Some(t);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        assert_eq!(find_paragraph_text(&nodes).as_deref(), Some("deep"));
    }

    #[test]
    fn classify_single_element() {
        let dom = html5_parse("<h4>x</h4>");
        let h = body_children(&dom).remove(0);
        assert!(matches!(classify_element(&h, 16), StructuredNode::Heading { level: 4, .. }));
    }
}
