use iced::color;
use iced::theme::Palette;
use iced::{Color, Theme};

use crate::settings::Appearance;

pub fn resolve_theme(appearance: Appearance, high_contrast: bool) -> Theme {
    let is_dark = match appearance {
        Appearance::Dark => true,
        Appearance::Light => false,
        Appearance::System => system_prefers_dark(),
    };

    let palette = match (is_dark, high_contrast) {
        (true, false) => Palette {
            background: color!(0x17, 0x1a, 0x21),
            text: color!(0xd8, 0xdc, 0xe3),
            primary: color!(0x00, 0xb4, 0xd8),
            success: color!(0x3d, 0xd6, 0x8c),
            warning: color!(0xf4, 0xc4, 0x30),
            danger: color!(0xff, 0x5c, 0x5c),
        },
        (false, false) => Palette {
            background: color!(0xf4, 0xf6, 0xf9),
            text: color!(0x1b, 0x1f, 0x27),
            primary: color!(0x00, 0x8c, 0xb0),
            success: color!(0x1f, 0xa8, 0x61),
            warning: color!(0xd9, 0x8e, 0x04),
            danger: color!(0xd6, 0x33, 0x33),
        },
        (true, true) => Palette {
            background: color!(0x00, 0x00, 0x00),
            text: color!(0xff, 0xff, 0xff),
            primary: color!(0x4c, 0xe0, 0xff),
            success: color!(0x4c, 0xff, 0x9a),
            warning: color!(0xff, 0xdd, 0x00),
            danger: color!(0xff, 0x66, 0x66),
        },
        (false, true) => Palette {
            background: color!(0xff, 0xff, 0xff),
            text: color!(0x00, 0x00, 0x00),
            primary: color!(0x00, 0x5a, 0x78),
            success: color!(0x00, 0x6b, 0x34),
            warning: color!(0x8a, 0x50, 0x00),
            danger: color!(0xb0, 0x00, 0x00),
        },
    };

    Theme::custom("FaceLens", palette)
}

/// Secondary text colour: body text at reduced opacity.
pub fn muted_color(theme: &Theme) -> Color {
    Color {
        a: 0.65,
        ..theme.palette().text
    }
}

/// Slightly raised panel background.
pub fn surface_color(theme: &Theme) -> Color {
    let palette = theme.extended_palette();
    if palette.is_dark {
        palette.background.weak.color
    } else {
        Color::WHITE
    }
}

fn system_prefers_dark() -> bool {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("defaults")
            .args(["read", "-g", "AppleInterfaceStyle"])
            .output()
            .map(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .trim()
                    .eq_ignore_ascii_case("dark")
            })
            .unwrap_or(true)
    }
    #[cfg(not(target_os = "macos"))]
    {
        true
    }
}
