//! UI chrome colors and color parsing for config values

use ratatui::style::Color;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
#[error("invalid color {value:?} (expected a name like \"blue\" or #RRGGBB / #RGB)")]
pub struct ColorParseError {
    pub value: String,
}

/// Theme colors for the UI frame. The "Hello, world!" text is not themed; it
/// takes the Visual Attribute.
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,      // Button border, key hints
    pub text: Color,        // Primary text
    pub text_dim: Color,    // Log timestamps, footer
    pub inactive: Color,    // Borders
    pub header: Color,      // Title line
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-inspired
        Self {
            accent: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(243, 139, 168),
        }
    }
}

/// Parse a color name or hex string
pub fn parse_color(s: &str) -> Result<Color, ColorParseError> {
    let s = s.trim();
    if let Some(color) = parse_short_hex(s) {
        return Ok(color);
    }
    Color::from_str(s).map_err(|_| ColorParseError {
        value: s.to_string(),
    })
}

/// #RGB, which ratatui does not accept on its own
fn parse_short_hex(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    let mut digits = hex.chars().map(|c| c.to_digit(16));
    let (r, g, b) = (digits.next()??, digits.next()??, digits.next()??);
    if digits.next().is_some() {
        return None;
    }
    // Each digit is < 16, so * 17 stays within u8
    Some(Color::Rgb((r * 17) as u8, (g * 17) as u8, (b * 17) as u8))
}

/// Inverse of [`parse_color`] for named and RGB colors
pub fn color_name(color: Color) -> String {
    match color {
        Color::Rgb(r, g, b) => format!("#{:02x}{:02x}{:02x}", r, g, b),
        other => other.to_string().to_lowercase(),
    }
}
