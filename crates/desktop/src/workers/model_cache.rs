use std::sync::{Arc, Mutex};
use std::thread;

use facelens_core::detection::domain::model_loader::ModelKind;
use facelens_core::detection::infrastructure::model_registry::ModelRegistry;
use facelens_core::detection::infrastructure::onnx_model_loader::OnnxModelLoader;
use facelens_core::pipeline::detect_face_use_case::DetectFaceUseCase;
use facelens_core::shared::config::AnalyzerConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    Loading {
        downloading: Option<(ModelKind, u64, u64)>,
    },
    Ready,
    Failed(String),
}

impl ModelStatus {
    /// One-line status for the footer.
    pub fn describe(&self) -> String {
        match self {
            ModelStatus::Loading {
                downloading: Some((kind, done, total)),
            } if *total > 0 => {
                format!("Downloading {kind} model... {}%", done * 100 / total)
            }
            ModelStatus::Loading {
                downloading: Some((kind, done, _)),
            } => format!("Downloading {kind} model... {} KB", done / 1024),
            ModelStatus::Loading { downloading: None } => "Loading models...".to_string(),
            ModelStatus::Ready => "Models ready".to_string(),
            ModelStatus::Failed(e) => format!("Model loading failed: {e}"),
        }
    }
}

/// Process-wide model registry, warmed up in the background at startup so
/// the first detection rarely has to wait. Every view shares its detector.
pub struct ModelCache {
    registry: Arc<ModelRegistry>,
    detector: Arc<DetectFaceUseCase>,
    status: Arc<Mutex<ModelStatus>>,
}

impl ModelCache {
    pub fn new(config: &AnalyzerConfig) -> Arc<Self> {
        let status = Arc::new(Mutex::new(ModelStatus::Loading { downloading: None }));

        let progress_status = status.clone();
        let loader = OnnxModelLoader::new(config).with_progress(Arc::new(
            move |kind: ModelKind, done: u64, total: u64| {
                if let Ok(mut status) = progress_status.lock() {
                    *status = ModelStatus::Loading {
                        downloading: Some((kind, done, total)),
                    };
                }
            },
        ));
        let registry = Arc::new(ModelRegistry::new(Box::new(loader)));
        let detector = Arc::new(DetectFaceUseCase::new(registry.clone()));

        let warm_registry = registry.clone();
        let warm_status = status.clone();
        thread::spawn(move || {
            let outcome = match warm_registry.ensure_loaded() {
                Ok(_) => ModelStatus::Ready,
                Err(e) => {
                    log::warn!("Model warm-up failed: {e}");
                    ModelStatus::Failed(e.to_string())
                }
            };
            if let Ok(mut status) = warm_status.lock() {
                *status = outcome;
            }
        });

        Arc::new(Self {
            registry,
            detector,
            status,
        })
    }

    pub fn detector(&self) -> Arc<DetectFaceUseCase> {
        self.detector.clone()
    }

    pub fn status(&self) -> ModelStatus {
        if self.registry.is_ready() {
            return ModelStatus::Ready;
        }
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or(ModelStatus::Loading { downloading: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_download_percent() {
        let status = ModelStatus::Loading {
            downloading: Some((ModelKind::AgeGender, 50, 200)),
        };
        assert_eq!(status.describe(), "Downloading AgeGender model... 25%");
    }

    #[test]
    fn test_describe_unknown_length_download() {
        let status = ModelStatus::Loading {
            downloading: Some((ModelKind::FaceDetector, 4096, 0)),
        };
        assert_eq!(status.describe(), "Downloading TinyFaceDetector model... 4 KB");
    }

    #[test]
    fn test_describe_failure() {
        let status = ModelStatus::Failed("offline".into());
        assert_eq!(status.describe(), "Model loading failed: offline");
    }
}
