//! Colour palettes for the three chart variants.

use crate::models::{ChartRequest, HexColor, Variant};

/// Colour of the message in a fallback chart.
pub const WARNING_COLOR: &str = "#d73a49";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub axis: &'static str,
    pub text: &'static str,
    pub grid: &'static str,
    pub line: &'static str,
}

pub const LIGHT: Palette = Palette {
    background: "#ffffff",
    axis: "#333333",
    text: "#333333",
    grid: "#e1e4e8",
    line: "#6b63ff",
};

pub const DARK: Palette = Palette {
    background: "#0d1117",
    axis: "#c9d1d9",
    text: "#c9d1d9",
    grid: "#30363d",
    line: "#a371f7",
};

impl Palette {
    fn rules(&self) -> String {
        format!(
            ".background{{fill:{bg}}}.axis{{stroke:{axis}}}.tick,.title{{fill:{text}}}\
             .grid{{stroke:{grid}}}.series{{stroke:{line}}}",
            bg = self.background,
            axis = self.axis,
            text = self.text,
            grid = self.grid,
            line = self.line,
        )
    }
}

/// Stylesheet for `variant`. The adaptive one follows the viewer's
/// `prefers-color-scheme`.
pub fn stylesheet(variant: Variant) -> String {
    match variant {
        Variant::Light => LIGHT.rules(),
        Variant::Dark => DARK.rules(),
        Variant::Adaptive => format!(
            "{}@media (prefers-color-scheme: dark){{{}}}",
            LIGHT.rules(),
            DARK.rules()
        ),
    }
}

/// Variant plus the caller's colour overrides. Overrides are written as inline
/// styles so they win over the stylesheet in every colour scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartStyle {
    pub variant: Variant,
    pub background: Option<HexColor>,
    pub axis: Option<HexColor>,
    pub line: Option<HexColor>,
}

impl ChartStyle {
    pub fn background_override(&self) -> Option<String> {
        self.background.as_ref().map(|c| format!("fill:{}", c))
    }

    pub fn axis_override(&self) -> Option<String> {
        self.axis.as_ref().map(|c| format!("stroke:{}", c))
    }

    pub fn text_override(&self) -> Option<String> {
        self.axis.as_ref().map(|c| format!("fill:{}", c))
    }

    pub fn line_override(&self) -> Option<String> {
        self.line.as_ref().map(|c| format!("stroke:{}", c))
    }
}

impl From<&ChartRequest> for ChartStyle {
    fn from(request: &ChartRequest) -> Self {
        Self {
            variant: request.variant,
            background: request.background.clone(),
            axis: request.axis.clone(),
            line: request.line.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adaptive_embeds_both_palettes() {
        let css = stylesheet(Variant::Adaptive);
        assert!(css.contains(LIGHT.background));
        assert!(css.contains("prefers-color-scheme: dark"));
        assert!(css.contains(DARK.background));

        assert!(!stylesheet(Variant::Light).contains(DARK.background));
        assert!(!stylesheet(Variant::Dark).contains(LIGHT.background));
    }
}
