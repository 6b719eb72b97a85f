use markup5ever_rcdom::{Handle, NodeData};

use crate::dom::{attr_get, collapse_ws, is_skipped_tag, tag_lower, text_content};
use crate::style::StyleState;

/// Run text standing for a `<br>`; the package writer emits it as `<w:br/>`.
pub const LINE_BREAK: &str = "\n";

/// A stretch of text sharing one formatting state, or a line break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub style: StyleState,
}

impl TextRun {
    /// `None` when `raw` is whitespace only.
    fn from_raw(raw: &str, style: &StyleState) -> Option<TextRun> {
        if raw.trim().is_empty() {
            return None;
        }
        Some(TextRun {
            text: collapse_ws(raw),
            style: style.clone(),
        })
    }

    fn line_break(style: &StyleState) -> TextRun {
        TextRun {
            text: LINE_BREAK.to_string(),
            style: style.clone(),
        }
    }

    pub fn is_line_break(&self) -> bool {
        self.text == LINE_BREAK
    }
}

/// Walks `root` in document order and returns its formatted runs. Each
/// `<br>` becomes a [`LINE_BREAK`] run.
///
/// `inherited` is the state in effect at `root`'s parent. Elements more than
/// `max_depth` levels below `root` are not descended into: their whole text
/// becomes one run with the state reached at that element.
pub fn extract_runs(root: &Handle, inherited: &StyleState, max_depth: usize) -> Vec<TextRun> {
    let mut runs = Vec::new();
    let mut stack: Vec<(Handle, StyleState, usize)> = vec![(root.clone(), inherited.clone(), 0)];

    while let Some((node, state, depth)) = stack.pop() {
        match &node.data {
            NodeData::Text { contents } => {
                if let Some(run) = TextRun::from_raw(&contents.borrow(), &state) {
                    runs.push(run);
                }
            }
            NodeData::Element { .. } => {
                let Some(tag) = tag_lower(&node) else { continue };
                if is_skipped_tag(&tag) {
                    continue;
                }
                if tag == "br" {
                    runs.push(TextRun::line_break(&state));
                    continue;
                }
                let style_attr = attr_get(&node, "style");
                let local = state.for_element(&tag, style_attr.as_deref());

                let kids = node.children.borrow();
                if kids.is_empty() || depth >= max_depth {
                    if let Some(run) = TextRun::from_raw(&text_content(&node), &local) {
                        runs.push(run);
                    }
                    continue;
                }
                for c in kids.iter().rev() {
                    stack.push((c.clone(), local.clone(), depth + 1));
                }
            }
            _ => {}
        }
    }

    runs
}

/// Plain text of a run list, concatenated.
pub fn runs_text(runs: &[TextRun]) -> String {
    runs.iter().map(|r| r.text.as_str()).collect()
}
