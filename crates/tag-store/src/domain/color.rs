//! Tag Colors
//!
//! A tag color is either one of the preset palette keys or a hex string.
//! Both forms serialize as plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::validation::TagValidationError;

/// Palette keys offered by the color picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresetColor {
    Default,
    Red,
    Orange,
    Yellow,
    Green,
    Teal,
    Blue,
    Purple,
    Pink,
    Gray,
}

impl PresetColor {
    pub const ALL: [PresetColor; 10] = [
        PresetColor::Default,
        PresetColor::Red,
        PresetColor::Orange,
        PresetColor::Yellow,
        PresetColor::Green,
        PresetColor::Teal,
        PresetColor::Blue,
        PresetColor::Purple,
        PresetColor::Pink,
        PresetColor::Gray,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PresetColor::Default => "default",
            PresetColor::Red => "red",
            PresetColor::Orange => "orange",
            PresetColor::Yellow => "yellow",
            PresetColor::Green => "green",
            PresetColor::Teal => "teal",
            PresetColor::Blue => "blue",
            PresetColor::Purple => "purple",
            PresetColor::Pink => "pink",
            PresetColor::Gray => "gray",
        }
    }

    /// Hex value used when rendering the preset
    pub fn hex(self) -> &'static str {
        match self {
            PresetColor::Default => "#666666",
            PresetColor::Red => "#e5484d",
            PresetColor::Orange => "#f76b15",
            PresetColor::Yellow => "#ffc53d",
            PresetColor::Green => "#30a46c",
            PresetColor::Teal => "#12a594",
            PresetColor::Blue => "#0090ff",
            PresetColor::Purple => "#8e4ec6",
            PresetColor::Pink => "#d6409f",
            PresetColor::Gray => "#8b8d98",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

/// Color of a tag: a preset key or a `#rgb` / `#rrggbb` hex string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TagColor {
    Preset(PresetColor),
    /// Lowercase, including the leading `#`
    Hex(String),
}

impl TagColor {
    /// Resolved hex value for rendering
    pub fn hex(&self) -> &str {
        match self {
            TagColor::Preset(p) => p.hex(),
            TagColor::Hex(h) => h,
        }
    }

    pub fn is_preset(&self) -> bool {
        matches!(self, TagColor::Preset(_))
    }
}

impl Default for TagColor {
    fn default() -> Self {
        TagColor::Preset(PresetColor::Default)
    }
}

impl fmt::Display for TagColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagColor::Preset(p) => f.write_str(p.key()),
            TagColor::Hex(h) => f.write_str(h),
        }
    }
}

impl FromStr for TagColor {
    type Err = TagValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(digits) = s.strip_prefix('#') {
            let valid_len = digits.len() == 3 || digits.len() == 6;
            if valid_len && digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Ok(TagColor::Hex(s.to_ascii_lowercase()));
            }
            return Err(TagValidationError::InvalidColor(s.to_string()));
        }
        PresetColor::from_key(&s.to_ascii_lowercase())
            .map(TagColor::Preset)
            .ok_or_else(|| TagValidationError::InvalidColor(s.to_string()))
    }
}

impl TryFrom<String> for TagColor {
    type Error = TagValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TagColor> for String {
    fn from(color: TagColor) -> Self {
        color.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preset_case_insensitive() {
        assert_eq!("Blue".parse::<TagColor>().unwrap(), TagColor::Preset(PresetColor::Blue));
        assert_eq!(" gray ".parse::<TagColor>().unwrap(), TagColor::Preset(PresetColor::Gray));
    }

    #[test]
    fn test_parse_hex_normalizes() {
        let c: TagColor = "#FF5733".parse().unwrap();
        assert_eq!(c, TagColor::Hex("#ff5733".to_string()));
        assert_eq!(c.hex(), "#ff5733");
        assert!("#abc".parse::<TagColor>().is_ok());
    }

    #[test]
    fn test_reject_bad_colors() {
        assert!("#12345".parse::<TagColor>().is_err());
        assert!("#gggggg".parse::<TagColor>().is_err());
        assert!("magenta".parse::<TagColor>().is_err());
        assert!("".parse::<TagColor>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&TagColor::Preset(PresetColor::Red)).unwrap();
        assert_eq!(json, "\"red\"");
        let back: TagColor = serde_json::from_str("\"#00FF00\"").unwrap();
        assert_eq!(back.to_string(), "#00ff00");
        assert!(serde_json::from_str::<TagColor>("\"nope\"").is_err());
    }
}
