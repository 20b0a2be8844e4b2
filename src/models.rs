use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StarChartsError;

/// Colour scheme of a rendered chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Light,
    Dark,
    /// Light by default, dark under `prefers-color-scheme: dark`
    #[default]
    Adaptive,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Light => write!(f, "light"),
            Variant::Dark => write!(f, "dark"),
            Variant::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl FromStr for Variant {
    type Err = StarChartsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "adaptive" => Ok(Variant::Adaptive),
            "light" => Ok(Variant::Light),
            "dark" => Ok(Variant::Dark),
            other => Err(StarChartsError::InvalidRequest(format!(
                "unknown variant '{}', expected light, dark or adaptive",
                other
            ))),
        }
    }
}

/// A `#rrggbb` colour. Parsing accepts 3 or 6 hex digits with or without `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct HexColor(String);

impl HexColor {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HexColor {
    type Err = StarChartsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StarChartsError::InvalidRequest(format!("invalid colour '{}'", s)));
        }
        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => digits.to_string(),
            _ => {
                return Err(StarChartsError::InvalidRequest(format!(
                    "invalid colour '{}', expected 3 or 6 hex digits",
                    s
                )))
            }
        };
        Ok(HexColor(format!("#{}", expanded.to_ascii_lowercase())))
    }
}

/// Everything that determines the bytes of one chart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartRequest {
    pub owner: String,
    pub repo: String,
    pub variant: Variant,
    pub background: Option<HexColor>,
    pub axis: Option<HexColor>,
    pub line: Option<HexColor>,
}

impl ChartRequest {
    pub fn new(owner: &str, repo: &str, variant: Variant) -> Result<Self, StarChartsError> {
        validate_name("owner", owner, |c| c.is_ascii_alphanumeric() || c == '-')?;
        validate_name("repository", repo, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
        })?;
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            variant,
            background: None,
            axis: None,
            line: None,
        })
    }

    pub fn with_background(mut self, color: HexColor) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_axis(mut self, color: HexColor) -> Self {
        self.axis = Some(color);
        self
    }

    pub fn with_line(mut self, color: HexColor) -> Self {
        self.line = Some(color);
        self
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Canonical cache key. GitHub names are case-insensitive, so the name part
    /// is lowercased.
    pub fn cache_key(&self) -> String {
        fn part(color: &Option<HexColor>) -> &str {
            color.as_ref().map(HexColor::as_str).unwrap_or("-")
        }
        format!(
            "chart:{}:{}:bg={}:axis={}:line={}",
            self.full_name().to_ascii_lowercase(),
            self.variant,
            part(&self.background),
            part(&self.axis),
            part(&self.line),
        )
    }
}

fn validate_name(what: &str, value: &str, allowed: impl Fn(char) -> bool) -> Result<(), StarChartsError> {
    if value.is_empty() || value.len() > 100 {
        return Err(StarChartsError::InvalidRepository(format!(
            "{} name must be 1 to 100 characters",
            what
        )));
    }
    if value == "." || value == ".." || !value.chars().all(allowed) {
        return Err(StarChartsError::InvalidRepository(format!(
            "invalid {} name '{}'",
            what, value
        )));
    }
    Ok(())
}
