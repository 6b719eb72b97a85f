/// Formatting inherited down the DOM while runs are extracted.
///
/// States only ever gain attributes on the way down: a flag that is on for a
/// parent stays on for every descendant, and `font` / `size_half_points` are
/// only replaced by a descendant that declares its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font: Option<String>,
    pub size_half_points: Option<u32>,
}

/// What an inline `style` attribute asks for. `false` / `None` means "not
/// declared", never "turn off".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleDelta {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font: Option<String>,
    pub size_half_points: Option<u32>,
}

impl StyleDelta {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl StyleState {
    /// Returns the state for a child carrying `delta`.
    pub fn apply(&self, delta: &StyleDelta) -> StyleState {
        StyleState {
            bold: self.bold || delta.bold,
            italic: self.italic || delta.italic,
            underline: self.underline || delta.underline,
            font: delta.font.clone().or_else(|| self.font.clone()),
            size_half_points: delta.size_half_points.or(self.size_half_points),
        }
    }

    /// Returns the state inside an element named `tag` (lowercase).
    pub fn with_tag(&self, tag: &str) -> StyleState {
        let mut out = self.clone();
        match tag {
            "b" | "strong" => out.bold = true,
            "i" | "em" | "cite" | "var" | "dfn" => out.italic = true,
            "u" | "ins" => out.underline = true,
            _ => {}
        }
        out
    }

    /// Tag-implied attributes first, then the inline style on top.
    pub fn for_element(&self, tag: &str, style_attr: Option<&str>) -> StyleState {
        let tagged = self.with_tag(tag);
        match style_attr {
            Some(s) => tagged.apply(&parse_inline_style(s)),
            None => tagged,
        }
    }
}

/// Parses a CSS declaration list such as `"font-weight: bold; font-size: 14px"`.
///
/// Unknown properties and unparseable values are skipped; the rest of the
/// declaration list is still read.
pub fn parse_inline_style(style: &str) -> StyleDelta {
    let mut delta = StyleDelta::default();

    for decl in style.split(';') {
        let Some((prop, value)) = decl.split_once(':') else {
            continue;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let value = strip_important(value.trim());
        if value.is_empty() {
            continue;
        }
        let lower = value.to_ascii_lowercase();

        match prop.as_str() {
            "font-weight" => {
                if is_bold_weight(&lower) {
                    delta.bold = true;
                }
            }
            "font-style" => {
                if lower.contains("italic") {
                    delta.italic = true;
                }
            }
            "text-decoration" | "text-decoration-line" => {
                if lower.contains("underline") {
                    delta.underline = true;
                }
            }
            "font-family" => {
                if let Some(font) = first_font_family(value) {
                    delta.font = Some(font);
                }
            }
            "font-size" => {
                if let Some(size) = font_size_half_points(&lower) {
                    delta.size_half_points = Some(size);
                }
            }
            _ => {}
        }
    }

    delta
}

fn strip_important(value: &str) -> &str {
    let lower = value.to_ascii_lowercase();
    match lower.find("!important") {
        Some(pos) => value[..pos].trim_end(),
        None => value,
    }
}

fn is_bold_weight(value: &str) -> bool {
    match value {
        "bold" | "bolder" => true,
        v => v.parse::<u32>().map(|w| w >= 600).unwrap_or(false),
    }
}

fn first_font_family(value: &str) -> Option<String> {
    let first = value.split(',').next()?;
    let name = first.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// `px` and `pt` sizes become half-points (`round(n * 2)`).
fn font_size_half_points(value: &str) -> Option<u32> {
    let number = value
        .strip_suffix("px")
        .or_else(|| value.strip_suffix("pt"))?
        .trim();
    let prefix_len = number
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(number.len());
    let n: f64 = number[..prefix_len].parse().ok()?;
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    Some(px_to_half_points(n))
}

pub fn px_to_half_points(px: f64) -> u32 {
    (px * 2.0).round() as u32
}
