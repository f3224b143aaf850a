use ratatui::style::Color;

pub const DEFAULT_THEME: &str = "light";

#[derive(Clone, Debug)]
pub struct Theme {
    pub key: &'static str,
    pub name: &'static str,
    pub primary: Color,
    pub accent: Color,
    pub highlight: Color,
    pub background: Color,
    pub surface: Color,
    pub text: Color,
    pub muted: Color,
}

struct ThemeDefinition {
    name: &'static str,
    primary: &'static str,
    accent: &'static str,
    highlight: &'static str,
    background: &'static str,
    surface: &'static str,
    text: &'static str,
    muted: &'static str,
}

const THEME_PRESETS: &[(&str, ThemeDefinition)] = &[
    (
        "light",
        ThemeDefinition {
            name: "Light",
            primary: "#4A6FA5",
            accent: "#D9822B",
            highlight: "#C9DDF2",
            background: "#EEF1F5",
            surface: "#FFFFFF",
            text: "#1F2933",
            muted: "#7B8794",
        },
    ),
    (
        "dark",
        ThemeDefinition {
            name: "Dark",
            primary: "#5E81AC",
            accent: "#D08770",
            highlight: "#76B3C5",
            background: "#2E3440",
            surface: "#3B4252",
            text: "#ECEFF4",
            muted: "#A3ABB9",
        },
    ),
];

impl Theme {
    /// Preset for `key`, or the light theme for anything unknown.
    pub fn from_name(key: &str) -> Self {
        THEME_PRESETS
            .iter()
            .find(|(preset, _)| *preset == key)
            .or_else(|| THEME_PRESETS.first())
            .map(|(preset, def)| Theme::from_definition(*preset, def))
            .unwrap_or_else(Theme::fallback)
    }

    fn from_definition(key: &'static str, def: &ThemeDefinition) -> Self {
        Theme {
            key,
            name: def.name,
            primary: color_from_hex(def.primary).unwrap_or(Color::Blue),
            accent: color_from_hex(def.accent).unwrap_or(Color::Yellow),
            highlight: color_from_hex(def.highlight).unwrap_or(Color::Cyan),
            background: color_from_hex(def.background).unwrap_or(Color::Reset),
            surface: color_from_hex(def.surface).unwrap_or(Color::Reset),
            text: color_from_hex(def.text).unwrap_or(Color::White),
            muted: color_from_hex(def.muted).unwrap_or(Color::Gray),
        }
    }

    fn fallback() -> Self {
        Theme {
            key: DEFAULT_THEME,
            name: "Light",
            primary: Color::Blue,
            accent: Color::Yellow,
            highlight: Color::Cyan,
            background: Color::Reset,
            surface: Color::Reset,
            text: Color::White,
            muted: Color::Gray,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.key == "dark"
    }

    /// The other preset.
    pub fn toggled(&self) -> Self {
        Theme::from_name(if self.is_dark() { "light" } else { "dark" })
    }
}

pub fn is_known_theme(key: &str) -> bool {
    THEME_PRESETS.iter().any(|(preset, _)| *preset == key)
}

pub fn color_from_hex(value: &str) -> Option<Color> {
    let normalized = normalize_hex(value)?;
    let r = u8::from_str_radix(&normalized[1..3], 16).ok()?;
    let g = u8::from_str_radix(&normalized[3..5], 16).ok()?;
    let b = u8::from_str_radix(&normalized[5..7], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

fn normalize_hex(value: &str) -> Option<String> {
    let mut cleaned = value.trim().to_string();
    if !cleaned.starts_with('#') {
        cleaned.insert(0, '#');
    }
    if cleaned.len() != 7 || !cleaned.is_ascii() {
        return None;
    }
    Some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(color_from_hex("#5E81AC"), Some(Color::Rgb(0x5e, 0x81, 0xac)));
        assert_eq!(color_from_hex("ffffff"), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(color_from_hex("#fff"), None);
        assert_eq!(color_from_hex("#zzzzzz"), None);
    }

    #[test]
    fn unknown_theme_falls_back_to_light() {
        assert_eq!(Theme::from_name("solarized").key, "light");
        assert!(!is_known_theme("solarized"));
    }

    #[test]
    fn toggle_flips_between_presets() {
        let light = Theme::from_name("light");
        assert!(!light.is_dark());
        let dark = light.toggled();
        assert!(dark.is_dark());
        assert_eq!(dark.toggled().key, "light");
    }
}
