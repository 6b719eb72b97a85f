//! The fallback chain: external converters, then structural mapping, then
//! plain text.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, info, warn};

use crate::classify::structure_document;
use crate::docx::{write_docx, DocumentMeta};
use crate::dom::html5_parse;
use crate::error::{ConvertError, ConverterError};
use crate::external::{detect_available, ExternalConverter};
use crate::mapper::map_nodes;
use crate::options::ConvertOptions;
use crate::plain::plain_text_blocks;

/// Which stage of the chain produced the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    External(String),
    Structured,
    PlainText,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::External(name) => write!(f, "external:{name}"),
            Strategy::Structured => f.write_str("structured"),
            Strategy::PlainText => f.write_str("plain-text"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub bytes: Vec<u8>,
    pub strategy: Strategy,
}

/// Stateless converter; one instance can serve any number of threads.
pub struct Engine {
    converters: Vec<Box<dyn ExternalConverter>>,
    options: ConvertOptions,
}

impl Engine {
    /// An engine without external converters.
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            converters: Vec::new(),
            options,
        }
    }

    /// An engine using every external converter installed on this machine.
    pub fn with_detected_converters(options: ConvertOptions) -> Self {
        let converters = detect_available();
        debug!(
            converters = ?converters.iter().map(|c| c.name().to_string()).collect::<Vec<_>>(),
            "detected external converters"
        );
        Self {
            converters,
            options,
        }
    }

    /// Appends `converter` after the ones already registered.
    pub fn with_converter(mut self, converter: impl ExternalConverter + 'static) -> Self {
        self.converters.push(Box::new(converter));
        self
    }

    pub fn converter_names(&self) -> Vec<&str> {
        self.converters.iter().map(|c| c.name()).collect()
    }

    /// Converts a rendered HTML document into `.docx` bytes.
    ///
    /// Fails only on empty input; every other problem is absorbed by a later
    /// stage of the chain.
    pub fn convert(&self, html: &str) -> Result<Conversion, ConvertError> {
        if html.is_empty() {
            return Err(ConvertError::EmptyInput);
        }
        if let Some(width) = self.options.page_width_px {
            debug!(page_width_px = width, "page width hint not used by the converter");
        }

        for converter in &self.converters {
            if let Some(bytes) = try_external(converter.as_ref(), html) {
                return Ok(finish(bytes, Strategy::External(converter.name().to_string())));
            }
        }

        let meta = DocumentMeta {
            title: self.options.title.clone(),
        };

        let dom = html5_parse(html);
        let nodes = structure_document(&dom, self.options.max_depth);
        let blocks = map_nodes(&nodes);
        if blocks.is_empty() {
            debug!("structured mapping produced no blocks");
        } else {
            match write_docx(&blocks, &meta) {
                Ok(bytes) => return Ok(finish(bytes, Strategy::Structured)),
                Err(err) => warn!(error = %err, blocks = blocks.len(), "structured document write failed"),
            }
        }

        let blocks = plain_text_blocks(html, self.options.max_paragraph_chars);
        debug!(chunks = blocks.len(), "plain-text fallback");
        let bytes = write_docx(&blocks, &meta)?;
        Ok(finish(bytes, Strategy::PlainText))
    }
}

/// Converts with default options and no external converters.
pub fn convert_html(html: &str) -> Result<Vec<u8>, ConvertError> {
    Engine::new(ConvertOptions::default())
        .convert(html)
        .map(|c| c.bytes)
}

fn finish(bytes: Vec<u8>, strategy: Strategy) -> Conversion {
    info!(strategy = %strategy, bytes = bytes.len(), "conversion finished");
    Conversion { bytes, strategy }
}

fn looks_like_docx(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

fn try_external(converter: &dyn ExternalConverter, html: &str) -> Option<Vec<u8>> {
    let name = converter.name();
    match catch_unwind(AssertUnwindSafe(|| converter.convert(html))) {
        Ok(Ok(bytes)) if looks_like_docx(&bytes) => Some(bytes),
        Ok(Ok(bytes)) => {
            warn!(converter = name, bytes = bytes.len(), "converter returned unusable output");
            None
        }
        Ok(Err(err @ ConverterError::Unavailable { .. })) => {
            debug!(converter = name, error = %err, "converter unavailable");
            None
        }
        Ok(Err(err)) => {
            warn!(converter = name, error = %err, "converter failed");
            None
        }
        Err(_) => {
            warn!(converter = name, "converter panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::tests::read_part;
    use crate::docx::{Block, BlockKind, Span};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    enum Behaviour {
        Unavailable,
        Fail,
        Panic,
        Garbage,
        Succeed(Vec<u8>),
    }

    struct FakeConverter {
        name: &'static str,
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    impl FakeConverter {
        fn new(name: &'static str, behaviour: Behaviour) -> Self {
            Self {
                name,
                behaviour,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ExternalConverter for FakeConverter {
        fn name(&self) -> &str {
            self.name
        }

        fn convert(&self, _html: &str) -> Result<Vec<u8>, ConverterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Unavailable => Err(ConverterError::unavailable(self.name, "not installed")),
                Behaviour::Fail => Err(ConverterError::failed(self.name, "exit status 1")),
                Behaviour::Panic => panic!("converter blew up"),
                Behaviour::Garbage => Ok(b"<html>not a docx</html>".to_vec()),
                Behaviour::Succeed(bytes) => Ok(bytes.clone()),
            }
        }
    }

    fn engine() -> Engine {
        Engine::new(ConvertOptions::default())
    }

    fn document(bytes: &[u8]) -> String {
        read_part(bytes, "word/document.xml").expect("document part")
    }

    fn external_docx() -> Vec<u8> {
        let block = Block::new(BlockKind::Paragraph, vec![Span::plain("from outside")]);
        write_docx(&[block], &DocumentMeta::default()).unwrap()
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(engine().convert(""), Err(ConvertError::EmptyInput)));
        assert!(matches!(convert_html(""), Err(ConvertError::EmptyInput)));
    }

    #[test]
    fn heading_and_bold_paragraph() {
        let out = engine()
            .convert("<h1>Title</h1><p>Hello <b>world</b></p>")
            .unwrap();
        assert_eq!(out.strategy, Strategy::Structured);
        let doc = document(&out.bytes);
        assert!(doc.contains("<w:pStyle w:val=\"Heading1\"/>"));
        assert!(doc.contains(">Title</w:t>"));
        assert!(doc.contains("<w:r><w:t xml:space=\"preserve\">Hello </w:t></w:r>"));
        assert!(doc.contains("<w:r><w:rPr><w:b/></w:rPr><w:t xml:space=\"preserve\">world</w:t></w:r>"));
    }

    #[test]
    fn br_is_written_as_a_line_break() {
        let out = engine().convert("<p>line one<br>line two</p>").unwrap();
        assert_eq!(out.strategy, Strategy::Structured);
        let doc = document(&out.bytes);
        assert!(doc.contains(">line one</w:t></w:r><w:r><w:br/></w:r><w:r><w:t xml:space=\"preserve\">line two</w:t>"));
        assert!(!doc.contains("line oneline two"));
    }

    #[test]
    fn unordered_list_becomes_bullets() {
        let out = engine().convert("<ul><li>A</li><li>B</li></ul>").unwrap();
        let doc = document(&out.bytes);
        assert_eq!(doc.matches("<w:numId w:val=\"1\"/>").count(), 2);
        assert!(doc.contains(">A</w:t>"));
        assert!(doc.contains(">B</w:t>"));
        assert!(read_part(&out.bytes, "word/numbering.xml").is_some());
    }

    #[test]
    fn ordered_list_is_numbered_inline() {
        let out = engine().convert("<ol><li>first</li><li>second</li></ol>").unwrap();
        let doc = document(&out.bytes);
        assert!(doc.contains(">1. first</w:t>"));
        assert!(doc.contains(">2. second</w:t>"));
        assert!(!doc.contains("<w:numPr>"));
    }

    #[test]
    fn inline_style_reaches_the_run() {
        let out = engine()
            .convert(r#"<p><span style="font-weight: bold; font-size: 14px">big</span></p>"#)
            .unwrap();
        let doc = document(&out.bytes);
        assert!(doc.contains("<w:b/><w:sz w:val=\"28\"/>"));
    }

    #[test]
    fn empty_div_yields_an_empty_document() {
        let out = engine().convert("<div></div>").unwrap();
        assert_eq!(out.strategy, Strategy::PlainText);
        let doc = document(&out.bytes);
        assert!(!doc.contains("<w:p>"));
    }

    #[test]
    fn never_fails_on_odd_input() {
        let inputs = [
            " ",
            "<",
            "<<<>>>",
            "</p>",
            "<div><span>",
            "<!--",
            "&&&;",
            "\u{0}\u{1}\u{7}",
            "<h7>not a heading</h7>",
            "<p style=\"font-size: 99999999999999999999px; font-weight: 9999999999999\">x</p>",
            "<ul><ol><li></li></ol></ul>",
        ];
        for input in inputs {
            let out = engine().convert(input).unwrap();
            assert!(out.bytes.starts_with(b"PK"), "input {input:?}");
            assert!(read_part(&out.bytes, "word/document.xml").is_some());
        }
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let depth = 5_000;
        let html = format!("{}<b>deep</b>{}", "<span>".repeat(depth), "</span>".repeat(depth));
        let out = engine().convert(&html).unwrap();
        assert!(document(&out.bytes).contains("deep"));
    }

    #[test]
    fn long_unstructured_text_is_chunked() {
        let sentence = format!("{}.", "a".repeat(199));
        let text = vec![sentence; 12].join(" ");
        let blocks = plain_text_blocks(&text, 1000);
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.text().chars().count() <= 1000));
    }

    #[test]
    fn external_success_short_circuits() {
        let expected = external_docx();
        let second = FakeConverter::new("second", Behaviour::Succeed(expected.clone()));
        let second_calls = second.calls.clone();
        let engine = engine()
            .with_converter(FakeConverter::new("first", Behaviour::Succeed(expected.clone())))
            .with_converter(second);

        let out = engine.convert("<p>ignored</p>").unwrap();
        assert_eq!(out.strategy, Strategy::External("first".into()));
        assert_eq!(out.bytes, expected);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failing_converters_fall_through_in_order() {
        let expected = external_docx();
        let engine = engine()
            .with_converter(FakeConverter::new("missing", Behaviour::Unavailable))
            .with_converter(FakeConverter::new("broken", Behaviour::Fail))
            .with_converter(FakeConverter::new("panics", Behaviour::Panic))
            .with_converter(FakeConverter::new("garbage", Behaviour::Garbage))
            .with_converter(FakeConverter::new("works", Behaviour::Succeed(expected)));
        assert_eq!(
            engine.converter_names(),
            vec!["missing", "broken", "panics", "garbage", "works"]
        );

        let out = engine.convert("<p>x</p>").unwrap();
        assert_eq!(out.strategy, Strategy::External("works".into()));
    }

    #[test]
    fn all_converters_failing_reaches_structured_mapping() {
        let engine = engine()
            .with_converter(FakeConverter::new("broken", Behaviour::Fail))
            .with_converter(FakeConverter::new("garbage", Behaviour::Garbage));
        let out = engine.convert("<h2>kept</h2>").unwrap();
        assert_eq!(out.strategy, Strategy::Structured);
        assert!(document(&out.bytes).contains(">kept</w:t>"));
    }

    #[test]
    fn title_is_written_when_configured() {
        let engine = Engine::new(ConvertOptions {
            title: Some("Weekly".into()),
            page_width_px: Some(1024),
            ..ConvertOptions::default()
        });
        let out = engine.convert("<p>x</p>").unwrap();
        let core = read_part(&out.bytes, "docProps/core.xml").unwrap();
        assert!(core.contains("<dc:title>Weekly</dc:title>"));
    }

    #[test]
    fn engine_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();

        let engine = Arc::new(engine());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || engine.convert(&format!("<p>n{i}</p>")).map(|c| c.bytes))
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            let bytes = h.join().unwrap().unwrap();
            assert!(document(&bytes).contains(&format!(">n{i}</w:t>")));
        }
    }

    #[test]
    fn strategy_display() {
        assert_eq!(Strategy::External("pandoc".into()).to_string(), "external:pandoc");
        assert_eq!(Strategy::Structured.to_string(), "structured");
        assert_eq!(Strategy::PlainText.to_string(), "plain-text");
    }
}
