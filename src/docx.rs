//! Minimal WordprocessingML package writer.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::PackageError;

/// Heading run sizes in half-points, level 1 first.
pub const HEADING_HALF_POINTS: [u32; 6] = [48, 40, 32, 28, 24, 22];
/// Largest font size Word accepts (1638 pt).
const MAX_HALF_POINTS: u32 = 3276;

/// One run of text. Each `'\n'` in `text` is written as a line break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font: Option<String>,
    pub size_half_points: Option<u32>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn has_properties(&self) -> bool {
        self.bold
            || self.italic
            || self.underline
            || self.font.is_some()
            || self.size_half_points.is_some_and(|s| s > 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    /// Level in `1..=6`.
    Heading(u8),
    Bullet,
}

/// Paragraph spacing in twentieths of a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spacing {
    pub before: u32,
    pub after: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub spans: Vec<Span>,
    pub spacing: Option<Spacing>,
    /// Left indent in twips.
    pub indent_left: Option<u32>,
}

impl Block {
    pub fn new(kind: BlockKind, spans: Vec<Span>) -> Self {
        Self {
            kind,
            spans,
            spacing: None,
            indent_left: None,
        }
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentMeta {
    pub title: Option<String>,
}

fn xml_escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Not representable in XML 1.0.
            '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => {}
            _ => out.push(ch),
        }
    }
    out
}

fn run_xml(span: &Span) -> String {
    if span.text.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    out.push_str("<w:r>");
    if span.has_properties() {
        out.push_str("<w:rPr>");
        if let Some(font) = &span.font {
            let f = xml_escape_text(font);
            out.push_str(&format!(
                "<w:rFonts w:ascii=\"{f}\" w:hAnsi=\"{f}\" w:cs=\"{f}\"/>"
            ));
        }
        if span.bold {
            out.push_str("<w:b/>");
        }
        if span.italic {
            out.push_str("<w:i/>");
        }
        if let Some(sz) = span
            .size_half_points
            .filter(|s| *s > 0)
            .map(|s| s.min(MAX_HALF_POINTS))
        {
            out.push_str(&format!("<w:sz w:val=\"{sz}\"/><w:szCs w:val=\"{sz}\"/>"));
        }
        if span.underline {
            out.push_str("<w:u w:val=\"single\"/>");
        }
        out.push_str("</w:rPr>");
    }
    for (i, part) in span.text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        if !part.is_empty() {
            out.push_str("<w:t xml:space=\"preserve\">");
            out.push_str(&xml_escape_text(part));
            out.push_str("</w:t>");
        }
    }
    out.push_str("</w:r>");
    out
}

fn paragraph_xml(block: &Block) -> String {
    let mut ppr = String::new();
    match block.kind {
        BlockKind::Paragraph => {}
        BlockKind::Heading(level) => {
            ppr.push_str(&format!("<w:pStyle w:val=\"Heading{}\"/>", level.clamp(1, 6)));
        }
        BlockKind::Bullet => {
            ppr.push_str("<w:numPr><w:ilvl w:val=\"0\"/><w:numId w:val=\"1\"/></w:numPr>");
        }
    }
    if let Some(sp) = block.spacing {
        ppr.push_str(&format!(
            "<w:spacing w:before=\"{}\" w:after=\"{}\"/>",
            sp.before, sp.after
        ));
    }
    if let Some(left) = block.indent_left {
        ppr.push_str(&format!("<w:ind w:left=\"{left}\"/>"));
    }

    let mut out = String::new();
    out.push_str("<w:p>");
    if !ppr.is_empty() {
        out.push_str("<w:pPr>");
        out.push_str(&ppr);
        out.push_str("</w:pPr>");
    }
    for span in &block.spans {
        out.push_str(&run_xml(span));
    }
    out.push_str("</w:p>");
    out
}

pub fn document_xml(blocks: &[Block]) -> String {
    let body: String = blocks.iter().map(paragraph_xml).collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
 xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
      <w:cols w:space="708"/>
      <w:docGrid w:linePitch="360"/>
    </w:sectPr>
  </w:body>
</w:document>"#
    )
}

fn content_types_xml(has_numbering: bool, has_core: bool) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    out.push('\n');
    out.push_str(
        r#"  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    );
    out.push('\n');
    out.push_str(r#"  <Default Extension="xml" ContentType="application/xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
    out.push('\n');
    out.push_str(r#"  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
    out.push('\n');
    if has_numbering {
        out.push_str(r#"  <Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/>"#);
        out.push('\n');
    }
    if has_core {
        out.push_str(r#"  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
        out.push('\n');
    }
    out.push_str("</Types>");
    out
}

fn rels_xml(has_core: bool) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    out.push('\n');
    out.push_str(r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#);
    out.push('\n');
    if has_core {
        out.push_str(r#"  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#);
        out.push('\n');
    }
    out.push_str("</Relationships>");
    out
}

fn document_rels_xml(has_numbering: bool) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    out.push('\n');
    out.push_str(r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
    out.push('\n');
    if has_numbering {
        out.push_str(r#"  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/>"#);
        out.push('\n');
    }
    out.push_str("</Relationships>");
    out
}

fn styles_xml() -> String {
    let mut headings = String::new();
    for (idx, sz) in HEADING_HALF_POINTS.iter().enumerate() {
        let level = idx + 1;
        headings.push_str(&format!(
            r#"  <w:style w:type="paragraph" w:styleId="Heading{level}">
    <w:name w:val="heading {level}"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="9"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:spacing w:before="240" w:after="120"/>
      <w:outlineLvl w:val="{idx}"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:sz w:val="{sz}"/>
      <w:szCs w:val="{sz}"/>
    </w:rPr>
  </w:style>
"#
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
{headings}</w:styles>"#
    )
}

fn numbering_xml() -> String {
    let mut levels = String::new();
    for ilvl in 0..9 {
        let left = 720 * (ilvl + 1);
        levels.push_str(&format!(
            r#"    <w:lvl w:ilvl="{ilvl}"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="•"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="{left}" w:hanging="360"/></w:pPr></w:lvl>
"#
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:abstractNum w:abstractNumId="1">
    <w:multiLevelType w:val="hybridMultilevel"/>
{levels}  </w:abstractNum>
  <w:num w:numId="1"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>"#
    )
}

fn core_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
 xmlns:dc="http://purl.org/dc/elements/1.1/"
 xmlns:dcterms="http://purl.org/dc/terms/"
 xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <dc:title>{}</dc:title>
</cp:coreProperties>"#,
        xml_escape_text(title)
    )
}

/// Serializes `blocks` into a complete `.docx` archive.
pub fn write_docx(blocks: &[Block], meta: &DocumentMeta) -> Result<Vec<u8>, PackageError> {
    let has_numbering = blocks.iter().any(|b| b.kind == BlockKind::Bullet);
    let title = meta.title.as_deref().map(str::trim).filter(|t| !t.is_empty());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opts)?;
    zip.write_all(content_types_xml(has_numbering, title.is_some()).as_bytes())?;

    zip.start_file("_rels/.rels", opts)?;
    zip.write_all(rels_xml(title.is_some()).as_bytes())?;

    zip.start_file("word/document.xml", opts)?;
    zip.write_all(document_xml(blocks).as_bytes())?;

    zip.start_file("word/styles.xml", opts)?;
    zip.write_all(styles_xml().as_bytes())?;

    if has_numbering {
        zip.start_file("word/numbering.xml", opts)?;
        zip.write_all(numbering_xml().as_bytes())?;
    }

    zip.start_file("word/_rels/document.xml.rels", opts)?;
    zip.write_all(document_rels_xml(has_numbering).as_bytes())?;

    if let Some(title) = title {
        zip.start_file("docProps/core.xml", opts)?;
        zip.write_all(core_xml(title).as_bytes())?;
    }

    Ok(zip.finish()?.into_inner())
}
