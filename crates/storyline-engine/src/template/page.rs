use serde::{Deserialize, Serialize};

use crate::models::Alignment;
use crate::template::style::mm_to_twips;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSize {
    A4,
    Letter,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PageSize {
    /// Width and height in millimetres.
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (210.0, 297.0),
            PageSize::Letter => (215.9, 279.4),
            PageSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageNumberPosition {
    #[default]
    Top,
    Bottom,
}

/// Page geometry and page numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    pub size: PageSize,
    /// Margins in millimetres
    pub margins: Margins,
    pub number_position: PageNumberPosition,
    pub number_alignment: Alignment,
    /// Share of the text width given to the left column in two-column mode
    pub split_ratio: f32,
    pub first_page_number: u32,
    pub show_first_page_number: bool,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: PageSize::Letter,
            margins: Margins {
                top: 25.4,
                bottom: 25.4,
                left: 38.1,
                right: 25.4,
            },
            number_position: PageNumberPosition::Top,
            number_alignment: Alignment::Right,
            split_ratio: 0.5,
            first_page_number: 1,
            show_first_page_number: false,
        }
    }
}

impl PageSetup {
    /// Width of the text area between the margins, in millimetres.
    pub fn text_width_mm(&self) -> f32 {
        let (width, _) = self.size.dimensions_mm();
        (width - self.margins.left - self.margins.right).max(0.0)
    }

    /// Height of the text area in twips.
    pub fn text_height_twips(&self) -> u32 {
        let (_, height) = self.size.dimensions_mm();
        mm_to_twips((height - self.margins.top - self.margins.bottom).max(0.0))
    }

    /// Width of the left column in two-column mode, in millimetres.
    pub fn left_column_width_mm(&self) -> f32 {
        self.text_width_mm() * self.split_ratio.clamp(0.1, 0.9)
    }
}
