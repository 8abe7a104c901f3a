pub mod analysis_panel;
pub mod frame_view;
pub mod primary_button;
