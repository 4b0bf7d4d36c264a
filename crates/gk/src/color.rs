//! Color values accepted in the `[theme]` config section

use ratatui::style::Color;
use std::collections::HashMap;

/// Parse `#rrggbb` or `#rgb` (the `#` is optional)
pub fn parse_hex(s: &str) -> Result<Color, String> {
    let digits = s.trim().trim_start_matches('#');
    if !digits.is_ascii() {
        return Err(format!("invalid hex color '{s}'"));
    }
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        n => {
            return Err(format!(
                "invalid hex color '{s}': expected 3 or 6 digits, got {n}"
            ))
        }
    };
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&expanded[range], 16).map_err(|_| format!("invalid hex color '{s}'"))
    };
    Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Parse an ANSI color name (`red`, `light-blue`, `dark_gray`, ...)
pub fn parse_ansi_name(name: &str) -> Option<Color> {
    let color = match name.to_lowercase().replace('-', "_").as_str() {
        "default" | "reset" | "transparent" | "none" => Color::Reset,
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "dark_gray" | "dark_grey" | "darkgray" | "darkgrey" => Color::DarkGray,
        "light_red" | "lightred" => Color::LightRed,
        "light_green" | "lightgreen" => Color::LightGreen,
        "light_yellow" | "lightyellow" => Color::LightYellow,
        "light_blue" | "lightblue" => Color::LightBlue,
        "light_magenta" | "lightmagenta" => Color::LightMagenta,
        "light_cyan" | "lightcyan" => Color::LightCyan,
        "white" => Color::White,
        _ => return None,
    };
    Some(color)
}

/// Resolve a color value: a name from `defs`, hex, a 256-color index, or an
/// ANSI name. Definitions may refer to each other, up to a small depth.
pub fn resolve_color(value: &str, defs: &HashMap<String, String>) -> Option<Color> {
    resolve_with_depth(value, defs, 4)
}

fn resolve_with_depth(value: &str, defs: &HashMap<String, String>, depth: u8) -> Option<Color> {
    let value = value.trim();
    if let Some(def) = defs.get(value) {
        return if depth == 0 {
            None
        } else {
            resolve_with_depth(def, defs, depth - 1)
        };
    }
    if value.starts_with('#') {
        return parse_hex(value).ok();
    }
    if let Ok(index) = value.parse::<u8>() {
        return Some(Color::Indexed(index));
    }
    parse_ansi_name(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#2ecc71"), Ok(Color::Rgb(0x2e, 0xcc, 0x71)));
        assert_eq!(parse_hex("fff"), Ok(Color::Rgb(255, 255, 255)));
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#zzzzzz").is_err());
    }

    #[test]
    fn test_parse_ansi_name() {
        assert_eq!(parse_ansi_name("red"), Some(Color::Red));
        assert_eq!(parse_ansi_name("dark-gray"), Some(Color::DarkGray));
        assert_eq!(parse_ansi_name("transparent"), Some(Color::Reset));
        assert_eq!(parse_ansi_name("unknown"), None);
    }

    #[test]
    fn test_resolve_color() {
        let mut defs = HashMap::new();
        defs.insert("green1".to_string(), "#A3BE8C".to_string());
        defs.insert("added".to_string(), "green1".to_string());
        defs.insert("loop".to_string(), "loop".to_string());

        assert_eq!(resolve_color("green1", &defs), Some(Color::Rgb(163, 190, 140)));
        assert_eq!(resolve_color("added", &defs), Some(Color::Rgb(163, 190, 140)));
        assert_eq!(resolve_color("#ff0000", &defs), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(resolve_color("240", &defs), Some(Color::Indexed(240)));
        assert_eq!(resolve_color("cyan", &defs), Some(Color::Cyan));
        assert_eq!(resolve_color("loop", &defs), None);
        assert_eq!(resolve_color("notacolor", &defs), None);
    }
}
