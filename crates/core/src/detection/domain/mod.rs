pub mod age_gender;
pub mod expression;
pub mod face_analysis;
pub mod face_detector;
pub mod face_landmarks;
pub mod model_loader;
pub mod model_set;
