use crate::classify::StructuredNode;
use crate::docx::{Block, BlockKind, Span, Spacing};
use crate::runs::TextRun;

pub const PARAGRAPH_SPACING: Spacing = Spacing {
    before: 120,
    after: 120,
};
pub const LIST_INDENT_TWIPS: u32 = 720;

impl From<&TextRun> for Span {
    fn from(run: &TextRun) -> Self {
        Span {
            text: run.text.clone(),
            bold: run.style.bold,
            italic: run.style.italic,
            underline: run.style.underline,
            font: run.style.font.clone(),
            size_half_points: run.style.size_half_points,
        }
    }
}

pub fn clamp_heading_level(level: u8) -> u8 {
    level.clamp(1, 6)
}

/// Flattens the node list into document blocks, groups spliced in place.
pub fn map_nodes(nodes: &[StructuredNode]) -> Vec<Block> {
    let mut out = Vec::new();
    let mut stack = vec![nodes.iter()];

    while let Some(top) = stack.last_mut() {
        let Some(node) = top.next() else {
            stack.pop();
            continue;
        };
        match node {
            StructuredNode::Group { children } => stack.push(children.iter()),
            StructuredNode::Heading { level, runs } => {
                let kind = BlockKind::Heading(clamp_heading_level(*level));
                out.push(Block::new(kind, to_spans(runs)));
            }
            StructuredNode::Paragraph { runs, text } => {
                let spans = if runs.iter().all(TextRun::is_line_break) {
                    if text.trim().is_empty() {
                        continue;
                    }
                    vec![Span::plain(text.as_str())]
                } else {
                    to_spans(runs)
                };
                out.push(paragraph_block(spans));
            }
            StructuredNode::List { ordered, items } => {
                for (idx, item) in items.iter().enumerate() {
                    out.push(list_block(*ordered, idx + 1, item));
                }
            }
        }
    }

    out
}

pub fn paragraph_block(spans: Vec<Span>) -> Block {
    let mut block = Block::new(BlockKind::Paragraph, spans);
    block.spacing = Some(PARAGRAPH_SPACING);
    block
}

fn to_spans(runs: &[TextRun]) -> Vec<Span> {
    runs.iter().map(Span::from).collect()
}

fn list_block(ordered: bool, number: usize, item: &[TextRun]) -> Block {
    let mut spans = to_spans(item);
    let kind = if ordered {
        let prefix = format!("{number}. ");
        if spans.is_empty() {
            spans.push(Span::plain(prefix));
        } else {
            spans[0].text.insert_str(0, &prefix);
        }
        BlockKind::Paragraph
    } else {
        BlockKind::Bullet
    };
    let mut block = Block::new(kind, spans);
    block.indent_left = Some(LIST_INDENT_TWIPS);
    block
}
