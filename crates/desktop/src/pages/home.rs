use iced::widget::{checkbox, column, container, pick_list, row, slider, text, Space};
use iced::{Element, Length};

use crate::app::{scaled, App, ButtonId, Message, Page};
use crate::settings::{Appearance, FACING_MODES};
use crate::widgets::primary_button::primary_button;

pub fn view(app: &App) -> Element<'_, Message> {
    let fs = app.settings.font_scale;

    let title = column![
        text("FaceLens").size(scaled(32.0, fs)).font(iced::Font {
            weight: iced::font::Weight::Bold,
            ..iced::Font::DEFAULT
        }),
        Space::new().height(6),
        text("Face analysis from your camera or a photo").size(scaled(15.0, fs)),
    ]
    .align_x(iced::Alignment::Center);

    let actions = row![
        primary_button(
            "Live Face",
            fs,
            Some(Message::Navigate(Page::Live)),
            app.hovered == Some(ButtonId::LiveFace),
            |h| Message::ButtonHover(ButtonId::LiveFace, h),
            Length::Fixed(scaled(160.0, fs)),
        ),
        primary_button(
            "Image Upload",
            fs,
            Some(Message::Navigate(Page::Upload)),
            app.hovered == Some(ButtonId::ImageUpload),
            |h| Message::ButtonHover(ButtonId::ImageUpload, h),
            Length::Fixed(scaled(160.0, fs)),
        ),
    ]
    .spacing(16);

    column![
        Space::new().height(Length::FillPortion(1)),
        title,
        Space::new().height(28),
        actions,
        Space::new().height(Length::FillPortion(1)),
        preferences(app),
    ]
    .align_x(iced::Alignment::Center)
    .width(Length::Fill)
    .into()
}

fn preferences(app: &App) -> Element<'_, Message> {
    let settings = &app.settings;
    let fs = settings.font_scale;
    let label = |s: &'static str| text(s).size(scaled(13.0, fs)).width(scaled(120.0, fs));

    let rows = column![
        row![
            label("Theme"),
            pick_list(Appearance::ALL, Some(settings.appearance), Message::AppearanceChanged)
                .text_size(scaled(13.0, fs)),
            checkbox(settings.high_contrast)
                .label("High contrast")
                .on_toggle(Message::HighContrastChanged)
                .text_size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        row![
            label("Font size"),
            slider(0.8..=1.5, settings.font_scale, Message::FontScaleChanged).step(0.05),
            text(format!("{:.0}%", settings.font_scale * 100.0)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        row![
            label("Camera"),
            pick_list(FACING_MODES, Some(settings.facing_mode), Message::FacingModeChanged)
                .text_size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        row![
            label("Confidence"),
            slider(10..=90, settings.confidence, Message::ConfidenceChanged).step(5u32),
            text(format!("{}% (next launch)", settings.confidence)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
    ]
    .spacing(10);

    container(rows).width(Length::Fixed(scaled(460.0, fs))).into()
}
