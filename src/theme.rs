// ── Theme system ───────────────────────────────────────────────

use crate::activity::Severity;
use crate::view::StatusLevel;
use colored::{Color, ColoredString, Colorize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Neon,
    Light,
    Mono,
}

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Theme::Neon => "Neon",
            Theme::Light => "Light",
            Theme::Mono => "Mono",
        }
    }

    pub fn from_label(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "light" => Theme::Light,
            "mono" => Theme::Mono,
            _ => Theme::Neon,
        }
    }

    pub fn colors(self) -> ThemeColors {
        match self {
            Theme::Neon => ThemeColors {
                accent: c(0xa8, 0x55, 0xf7),
                teal: c(0x2e, 0xe6, 0xd7),
                green: c(0x50, 0xfa, 0x7b),
                red: c(0xff, 0x55, 0x55),
                yellow: c(0xf1, 0xfa, 0x8c),
                muted: c(0x72, 0x74, 0x88),
            },
            Theme::Light => ThemeColors {
                accent: c(0x7c, 0x3a, 0xed),
                teal: c(0x0d, 0x94, 0x88),
                green: c(0x16, 0xa3, 0x4a),
                red: c(0xdc, 0x26, 0x26),
                yellow: c(0xa1, 0x6b, 0x07),
                muted: c(0x64, 0x74, 0x8b),
            },
            Theme::Mono => ThemeColors {
                accent: Color::White,
                teal: Color::White,
                green: Color::White,
                red: Color::White,
                yellow: Color::White,
                muted: Color::BrightBlack,
            },
        }
    }
}

const fn c(r: u8, g: u8, b: u8) -> Color {
    Color::TrueColor { r, g, b }
}

#[derive(Clone, Copy, Debug)]
pub struct ThemeColors {
    pub accent: Color,
    pub teal: Color,
    pub green: Color,
    pub red: Color,
    pub yellow: Color,
    pub muted: Color,
}

impl ThemeColors {
    pub fn severity(&self, severity: Severity) -> Color {
        match severity {
            Severity::Error => self.red,
            Severity::Warning => self.yellow,
            Severity::Success => self.green,
            Severity::Info => self.teal,
        }
    }

    pub fn status(&self, level: StatusLevel) -> Color {
        match level {
            StatusLevel::Good => self.green,
            StatusLevel::Bad => self.red,
            StatusLevel::Unknown => self.yellow,
        }
    }

    pub fn paint(&self, text: &str, color: Color) -> ColoredString {
        text.color(color)
    }

    pub fn dim(&self, text: &str) -> ColoredString {
        text.color(self.muted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        for t in [Theme::Neon, Theme::Light, Theme::Mono] {
            assert_eq!(Theme::from_label(t.label()), t);
        }
        assert_eq!(Theme::from_label("mono"), Theme::Mono);
        assert_eq!(Theme::from_label("something else"), Theme::Neon);
    }

    #[test]
    fn severity_colors_are_distinct_in_color_themes() {
        let tc = Theme::Neon.colors();
        assert_ne!(tc.severity(Severity::Error), tc.severity(Severity::Success));
        assert_eq!(tc.status(StatusLevel::Bad), tc.red);
    }
}
