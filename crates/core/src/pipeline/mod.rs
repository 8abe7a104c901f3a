pub mod analysis_sink;
pub mod analyze_image_use_case;
pub mod detect_face_use_case;
pub mod live_session_use_case;
pub mod render_loop;
