use iced::widget::{button, column, row, text, Space};
use iced::{Element, Length, Theme};

use crate::app::{scaled, App, ButtonId, Message, Page};
use crate::theme::muted_color;
use crate::widgets::analysis_panel::analysis_panel;
use crate::widgets::frame_view::frame_view;
use crate::widgets::primary_button::primary_button;

pub fn view<'a>(app: &'a App, theme: &Theme) -> Element<'a, Message> {
    let fs = app.settings.font_scale;
    let upload = &app.upload;
    let width = Length::Fixed(scaled(150.0, fs));
    let can_analyze = upload.image.is_some() && !upload.busy;

    let toolbar = row![
        button(text("\u{2190} Back").size(scaled(14.0, fs)))
            .on_press(Message::Navigate(Page::Home))
            .style(button::text),
        Space::new().width(Length::Fill),
        primary_button(
            "Select an image",
            fs,
            (!upload.busy).then_some(Message::SelectImage),
            app.hovered == Some(ButtonId::SelectImage),
            |h| Message::ButtonHover(ButtonId::SelectImage, h),
            width,
        ),
        primary_button(
            if upload.busy { "Analyzing..." } else { "Analyze" },
            fs,
            can_analyze.then_some(Message::Analyze),
            app.hovered == Some(ButtonId::Analyze),
            |h| Message::ButtonHover(ButtonId::Analyze, h),
            width,
        ),
    ]
    .spacing(10)
    .align_y(iced::Alignment::Center);

    let mut body = row![frame_view(
        upload.image.as_ref(),
        "No image selected",
        fs,
        theme
    )]
    .spacing(16);
    if let Some(analysis) = &upload.analysis {
        body = body.push(analysis_panel(analysis, fs, theme));
    }

    let mut page = column![toolbar, Space::new().height(12)].spacing(6);
    if let Some(notice) = &upload.notice {
        page = page.push(
            text(notice.clone())
                .size(scaled(13.0, fs))
                .color(muted_color(theme)),
        );
    }
    page.push(body.height(Length::Fill)).into()
}
