pub mod execution_provider;
pub mod math;
pub mod model_registry;
pub mod onnx_age_gender_net;
pub mod onnx_blazeface_detector;
pub mod onnx_expression_net;
pub mod onnx_landmark_net;
pub mod onnx_model_loader;
pub mod tensor;
