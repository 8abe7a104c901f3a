use iced::border::Border;
use iced::widget::{column, container, row, text, Space};
use iced::{Element, Length, Theme};

use facelens_core::detection::domain::face_analysis::FrameAnalysis;

use crate::app::scaled;
use crate::theme::{muted_color, surface_color};

/// Label/value pairs in display order.
pub fn rows(analysis: &FrameAnalysis) -> Vec<(&'static str, String)> {
    vec![
        ("Gender", analysis.gender.to_string()),
        ("Age", analysis.age.to_string()),
        ("Expression", analysis.dominant_expression.to_string()),
        ("Hair color", analysis.hair_color.clone()),
        ("Eye color", analysis.eye_color.clone()),
        ("Score", format!("{}%", analysis.score)),
    ]
}

pub fn analysis_panel<'a, Message: 'a>(
    analysis: &FrameAnalysis,
    fs: f32,
    theme: &Theme,
) -> Element<'a, Message> {
    let muted = muted_color(theme);
    let background = surface_color(theme);

    let lines = rows(analysis).into_iter().map(|(label, value)| -> Element<'a, Message> {
        row![
            text(label).size(scaled(13.0, fs)).color(muted),
            Space::new().width(Length::Fill),
            text(value).size(scaled(14.0, fs)),
        ]
        .align_y(iced::Alignment::Center)
        .into()
    });

    container(column(lines).spacing(8))
        .padding(16)
        .width(Length::Fixed(scaled(240.0, fs)))
        .style(move |_: &Theme| container::Style {
            background: Some(background.into()),
            border: Border {
                radius: 12.0.into(),
                ..Border::default()
            },
            ..container::Style::default()
        })
        .into()
}
