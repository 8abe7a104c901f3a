use iced::widget::{button, column, row, text, Space};
use iced::{Element, Length, Theme};

use facelens_core::capture::domain::capture_device::FacingMode;

use crate::app::{scaled, App, ButtonId, Message, Page};
use crate::theme::muted_color;
use crate::widgets::analysis_panel::analysis_panel;
use crate::widgets::frame_view::frame_view;
use crate::widgets::primary_button::primary_button;

pub fn view<'a>(app: &'a App, theme: &Theme) -> Element<'a, Message> {
    let fs = app.settings.font_scale;
    let live = &app.live;
    let width = Length::Fixed(scaled(140.0, fs));

    let toggle_label = match (live.active, live.pending) {
        (_, true) => "Please wait...",
        (true, false) => "Camera Off",
        (false, false) => "Camera On",
    };
    let toolbar = row![
        button(text("\u{2190} Back").size(scaled(14.0, fs)))
            .on_press(Message::Navigate(Page::Home))
            .style(button::text),
        Space::new().width(Length::Fill),
        primary_button(
            toggle_label,
            fs,
            (!live.pending).then_some(Message::ToggleCamera),
            app.hovered == Some(ButtonId::CameraToggle),
            |h| Message::ButtonHover(ButtonId::CameraToggle, h),
            width,
        ),
        primary_button(
            "Flip Camera",
            fs,
            (live.active && !live.pending).then_some(Message::FlipCamera),
            app.hovered == Some(ButtonId::FlipCamera),
            |h| Message::ButtonHover(ButtonId::FlipCamera, h),
            width,
        ),
    ]
    .spacing(10)
    .align_y(iced::Alignment::Center);

    let placeholder = if live.active {
        "Waiting for the camera..."
    } else {
        "Camera is off"
    };
    let mut body = row![frame_view(live.frame.as_ref(), placeholder, fs, theme)].spacing(16);
    if let Some(analysis) = &live.analysis {
        body = body.push(analysis_panel(analysis, fs, theme));
    }

    let mut page = column![toolbar, Space::new().height(12)];
    if let Some(error) = &live.error {
        page = page.push(
            text(error.clone())
                .size(scaled(13.0, fs))
                .color(theme.palette().danger),
        );
    }
    page = page.push(
        text(match live.facing {
            FacingMode::User => "Front camera",
            FacingMode::Environment => "Rear camera",
        })
        .size(scaled(12.0, fs))
        .color(muted_color(theme)),
    );
    page.push(body.height(Length::Fill)).spacing(6).into()
}
