use iced::widget::{container, image, text};
use iced::{ContentFit, Element, Length};

use facelens_core::shared::frame::Frame;

use crate::app::scaled;
use crate::theme::muted_color;

/// Uploads a frame (RGB or RGBA) as an image handle.
pub fn frame_handle(frame: &Frame) -> image::Handle {
    let rgba = frame.to_rgba();
    let (width, height) = (rgba.width(), rgba.height());
    image::Handle::from_rgba(width, height, rgba.into_data())
}

/// The latest frame scaled to fit, or a placeholder line.
pub fn frame_view<'a, Message: 'a>(
    handle: Option<&image::Handle>,
    placeholder: &str,
    fs: f32,
    theme: &iced::Theme,
) -> Element<'a, Message> {
    let content: Element<'a, Message> = match handle {
        Some(handle) => image(handle.clone())
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        None => text(placeholder.to_owned())
            .size(scaled(14.0, fs))
            .color(muted_color(theme))
            .into(),
    };
    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}
