pub mod analyze_worker;
pub mod live_worker;
pub mod model_cache;
