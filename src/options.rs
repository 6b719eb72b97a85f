pub const DEFAULT_MAX_PARAGRAPH_CHARS: usize = 1000;
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Per-conversion settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Page width hint for the page renderer. Carried through, never read by
    /// the conversion itself.
    pub page_width_px: Option<u32>,
    /// Upper bound (in characters) for a plain-text fallback paragraph.
    pub max_paragraph_chars: usize,
    /// Maximum element nesting the walkers descend into.
    pub max_depth: usize,
    /// Written to `docProps/core.xml` when present.
    pub title: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            page_width_px: None,
            max_paragraph_chars: DEFAULT_MAX_PARAGRAPH_CHARS,
            max_depth: DEFAULT_MAX_DEPTH,
            title: None,
        }
    }
}
