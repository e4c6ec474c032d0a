//! Text layout measurement.
//!
//! Text box heights are derived from the wrapped layout of their content, so
//! the editor and every renderer must wrap text the same way. The
//! [`TextMeasurer`] trait is that shared seam. [`ApproxTextMeasurer`] is a
//! font-free implementation based on average glyph advances.

use crate::geometry::CanvasMetrics;

/// Wrapped lines of a text block.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<String>,
    /// Height of one line in pixels.
    pub line_height: f64,
}

impl TextLayout {
    /// Total height in pixels.
    pub fn height(&self) -> f64 {
        self.lines.len() as f64 * self.line_height
    }
}

/// Lays out text into lines no wider than a given width.
pub trait TextMeasurer: Send + Sync {
    /// Height of one line at `font_px`.
    fn line_height(&self, font_px: f64) -> f64;

    /// Advance width of `text` on a single line.
    fn measure_width(&self, text: &str, font_px: f64) -> f64;

    /// Wrap `text` to `max_width` pixels. Hard line breaks are kept. Words
    /// wider than the box are broken between characters.
    fn layout(&self, text: &str, font_px: f64, max_width: f64) -> TextLayout {
        let mut lines = Vec::new();
        for paragraph in text.split('\n') {
            wrap_paragraph(self, paragraph, font_px, max_width, &mut lines);
        }
        TextLayout { lines, line_height: self.line_height(font_px) }
    }
}

fn wrap_paragraph<M: TextMeasurer + ?Sized>(
    measurer: &M,
    paragraph: &str,
    font_px: f64,
    max_width: f64,
    lines: &mut Vec<String>,
) {
    let mut current = String::new();
    for word in paragraph.split(' ') {
        let candidate = if current.is_empty() { word.to_string() } else { format!("{current} {word}") };
        if measurer.measure_width(&candidate, font_px) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        // Break words that do not fit on a line of their own.
        for ch in word.chars() {
            current.push(ch);
            if current.chars().count() > 1 && measurer.measure_width(&current, font_px) > max_width {
                current.pop();
                lines.push(std::mem::replace(&mut current, ch.to_string()));
            }
        }
    }
    lines.push(current);
}

/// Measurer based on a fixed average advance per character.
#[derive(Debug, Clone, Copy)]
pub struct ApproxTextMeasurer {
    /// Average advance as a fraction of the font size.
    pub char_width_factor: f64,
    /// Line height as a multiple of the font size.
    pub line_spacing: f64,
}

impl Default for ApproxTextMeasurer {
    fn default() -> Self {
        // Serif body text averages a bit above half an em.
        Self { char_width_factor: 0.58, line_spacing: 1.2 }
    }
}

impl TextMeasurer for ApproxTextMeasurer {
    fn line_height(&self, font_px: f64) -> f64 {
        font_px * self.line_spacing
    }

    fn measure_width(&self, text: &str, font_px: f64) -> f64 {
        text.chars().count() as f64 * font_px * self.char_width_factor
    }
}

/// Normalized height of a text box of `width` (normalized) holding `text`.
///
/// Without a laid-out canvas the height is estimated from the line count
/// alone. Otherwise it is the wrapped layout height, at least one line.
/// Either way it is capped at the page height.
pub fn text_height_normalized(
    measurer: &dyn TextMeasurer,
    text: &str,
    font_size_sp: f64,
    width: f64,
    canvas: Option<&CanvasMetrics>,
) -> f64 {
    let canvas = match canvas {
        Some(c) if !c.is_empty() => c,
        _ => {
            let lines = text.split('\n').count().max(1);
            return ((font_size_sp / 120.0) * lines as f64).min(1.0);
        }
    };
    let content = if text.is_empty() { " " } else { text };
    let font_px = font_size_sp * canvas.density;
    let width_px = (width * canvas.width).max(1.0);
    let layout = measurer.layout(content, font_px, width_px);
    let height_px = layout.height().max(measurer.line_height(font_px));
    (height_px / canvas.height).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurer() -> ApproxTextMeasurer {
        // 10px advance at 20px.
        ApproxTextMeasurer { char_width_factor: 0.5, line_spacing: 1.2 }
    }

    #[test]
    fn test_wrap_words() {
        let layout = measurer().layout("aaa bbb ccc", 20.0, 75.0);
        assert_eq!(layout.lines, vec!["aaa bbb", "ccc"]);
        assert_eq!(layout.line_height, 24.0);
        assert_eq!(layout.height(), 48.0);
    }

    #[test]
    fn test_hard_breaks_kept() {
        let layout = measurer().layout("a\n\nb", 20.0, 500.0);
        assert_eq!(layout.lines, vec!["a", "", "b"]);
    }

    #[test]
    fn test_long_word_broken() {
        let layout = measurer().layout("abcdefgh", 20.0, 30.0);
        assert_eq!(layout.lines, vec!["abc", "def", "gh"]);
    }

    #[test]
    fn test_height_without_canvas() {
        let h = text_height_normalized(&measurer(), "one\ntwo", 24.0, 0.45, None);
        assert!((h - 0.4).abs() < 1e-12);
        let empty = CanvasMetrics::new(0.0, 0.0, 1.0);
        let h = text_height_normalized(&measurer(), "", 12.0, 0.45, Some(&empty));
        assert!((h - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_height_with_canvas() {
        let canvas = CanvasMetrics::new(1000.0, 1000.0, 1.0);
        // 450px wide box, 10px advance: 45 chars per line.
        let h = text_height_normalized(&measurer(), "short", 20.0, 0.45, Some(&canvas));
        assert!((h - 0.024).abs() < 1e-12);
        let long = "word ".repeat(20);
        let h = text_height_normalized(&measurer(), long.trim_end(), 20.0, 0.45, Some(&canvas));
        assert!((h - 0.072).abs() < 1e-12);
    }

    #[test]
    fn test_height_capped_at_page() {
        let canvas = CanvasMetrics::new(100.0, 100.0, 1.0);
        let text = "line\n".repeat(50);
        assert_eq!(text_height_normalized(&measurer(), &text, 20.0, 0.5, Some(&canvas)), 1.0);
        assert_eq!(text_height_normalized(&measurer(), "a\nb\nc\nd\ne\nf\ng\nh", 30.0, 0.45, None), 1.0);
    }
}
