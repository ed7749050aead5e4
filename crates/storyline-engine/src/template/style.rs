use serde::{Deserialize, Serialize};

use crate::models::{Alignment, BlockType};

/// Twips per typographic point.
pub const TWIPS_PER_POINT: u32 = 20;

/// Convert millimetres to points.
pub fn mm_to_points(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}

/// Convert millimetres to twips, rounded to the nearest twip.
pub fn mm_to_twips(mm: f32) -> u32 {
    (mm_to_points(mm) * TWIPS_PER_POINT as f32).round().max(0.0) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    /// Size in points
    pub size: f32,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Courier Prime".to_string(),
            size: 12.0,
        }
    }
}

impl Font {
    /// Advance of one character, assuming a monospaced face.
    pub fn char_width_points(&self) -> f32 {
        self.size * 0.6
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "points")]
pub enum LineSpacing {
    #[default]
    Single,
    OneAndHalf,
    Double,
    /// Exact line height in points
    Fixed(f32),
}

impl LineSpacing {
    /// Height of one line in twips for a font of `font_size` points.
    pub fn line_height_twips(self, font_size: f32) -> u32 {
        let points = match self {
            LineSpacing::Single => font_size,
            LineSpacing::OneAndHalf => font_size * 1.5,
            LineSpacing::Double => font_size * 2.0,
            LineSpacing::Fixed(points) => points,
        };
        (points * TWIPS_PER_POINT as f32).round().max(1.0) as u32
    }
}

/// How paragraphs of one block type look on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParagraphStyle {
    pub block_type: BlockType,
    pub font: Font,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub uppercase: bool,
    pub alignment: Alignment,
    /// Empty lines above the paragraph
    pub lines_before: u32,
    pub lines_after: u32,
    pub left_indent_mm: f32,
    pub right_indent_mm: f32,
    /// Indents used when the page is laid out in two columns
    pub left_indent_in_columns_mm: f32,
    pub right_indent_in_columns_mm: f32,
    pub line_spacing: LineSpacing,
    pub starts_new_page: bool,
    /// Whether the type's title is shown in navigation and exports
    pub show_title: bool,
    pub title: Option<String>,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        Self {
            block_type: BlockType::Action,
            font: Font::default(),
            bold: false,
            italic: false,
            underline: false,
            uppercase: false,
            alignment: Alignment::Left,
            lines_before: 0,
            lines_after: 0,
            left_indent_mm: 0.0,
            right_indent_mm: 0.0,
            left_indent_in_columns_mm: 0.0,
            right_indent_in_columns_mm: 0.0,
            line_spacing: LineSpacing::Single,
            starts_new_page: false,
            show_title: false,
            title: None,
        }
    }
}

impl ParagraphStyle {
    pub fn line_height_twips(&self) -> u32 {
        self.line_spacing.line_height_twips(self.font.size)
    }

    /// Displayed name of the type, honouring a custom title.
    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.block_type.as_str().replace('_', " "))
    }

    /// Text width in characters for a text area `area_width_mm` wide.
    pub fn chars_per_line(&self, area_width_mm: f32, columns: bool) -> usize {
        let (left, right) = self.indents(columns);
        let width_points = mm_to_points((area_width_mm - left - right).max(0.0));
        // Tolerance for mm values that are exact in inches but not in f32
        ((width_points / self.font.char_width_points() + 1e-3).floor() as usize).max(1)
    }

    /// Left indent in characters, for fixed-pitch renderings.
    pub fn indent_chars(&self, columns: bool) -> usize {
        let (left, _) = self.indents(columns);
        (mm_to_points(left) / self.font.char_width_points()).round() as usize
    }

    fn indents(&self, columns: bool) -> (f32, f32) {
        if columns {
            (self.left_indent_in_columns_mm, self.right_indent_in_columns_mm)
        } else {
            (self.left_indent_mm, self.right_indent_mm)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LineSpacing::Single, 12.0, 240)]
    #[case(LineSpacing::OneAndHalf, 12.0, 360)]
    #[case(LineSpacing::Double, 12.0, 480)]
    #[case(LineSpacing::Fixed(14.0), 12.0, 280)]
    fn test_line_height(#[case] spacing: LineSpacing, #[case] size: f32, #[case] twips: u32) {
        assert_eq!(spacing.line_height_twips(size), twips);
    }

    #[test]
    fn test_courier_twelve_fits_sixty_chars_in_six_inches() {
        let style = ParagraphStyle::default();
        assert_eq!(style.chars_per_line(152.4, false), 60);
    }

    #[test]
    fn test_indent_chars() {
        let style = ParagraphStyle {
            left_indent_mm: 25.4,
            ..ParagraphStyle::default()
        };
        assert_eq!(style.indent_chars(false), 10);
        assert_eq!(style.chars_per_line(152.4, false), 50);
    }

    #[test]
    fn test_display_title_falls_back_to_type_name() {
        let style = ParagraphStyle {
            block_type: BlockType::SceneHeading,
            ..ParagraphStyle::default()
        };
        assert_eq!(style.display_title(), "scene heading");
    }
}
