//! Converts rendered HTML documents into `.docx`.
//!
//! [`Engine::convert`] tries each registered external converter, then maps
//! the document's headings, paragraphs and lists onto WordprocessingML, and
//! finally falls back to the page's plain text. Only empty input is an error.

pub mod classify;
pub mod convert;
pub mod docx;
pub mod dom;
pub mod error;
pub mod external;
pub mod mapper;
pub mod options;
pub mod plain;
pub mod runs;
pub mod style;

pub use classify::{classify_element, structure_document, StructuredNode};
pub use convert::{convert_html, Conversion, Engine, Strategy};
pub use docx::{write_docx, Block, BlockKind, DocumentMeta, Span};
pub use error::{ConvertError, ConverterError, PackageError};
pub use external::{ExternalConverter, LibreOfficeConverter, PandocConverter};
pub use mapper::map_nodes;
pub use options::ConvertOptions;
pub use plain::{split_paragraphs, strip_tags};
pub use runs::{extract_runs, TextRun};
pub use style::{parse_inline_style, StyleDelta, StyleState};
