use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::detection::domain::age_gender::AgeGenderNet;
use crate::detection::domain::expression::ExpressionNet;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::LandmarkNet;
use crate::detection::domain::model_loader::{ModelKind, ModelLoadError, ModelLoader};
use crate::shared::config::AnalyzerConfig;
use crate::shared::model_resolver::{self, artifact_url, ProgressFn};

use super::onnx_age_gender_net::OnnxAgeGenderNet;
use super::onnx_blazeface_detector::OnnxBlazefaceDetector;
use super::onnx_expression_net::OnnxExpressionNet;
use super::onnx_landmark_net::OnnxLandmarkNet;

/// Download progress for one artifact: `(kind, bytes_downloaded, total_bytes)`.
pub type LoadProgressFn = Arc<dyn Fn(ModelKind, u64, u64) + Send + Sync>;

/// Resolves each artifact (cache, bundled dir, then download) and opens it
/// as an ONNX session.
pub struct OnnxModelLoader {
    base_url: String,
    bundled_dir: Option<PathBuf>,
    cache_dir: Option<PathBuf>,
    confidence: f64,
    progress: Option<LoadProgressFn>,
}

impl OnnxModelLoader {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            base_url: config.model_base_url.clone(),
            bundled_dir: config.bundled_model_dir.clone(),
            cache_dir: None,
            confidence: config.confidence,
            progress: None,
        }
    }

    /// Overrides the platform model cache directory.
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    pub fn with_progress(mut self, progress: LoadProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Local path of `kind`'s artifact, downloading it if needed.
    pub fn fetch(&self, kind: ModelKind) -> Result<PathBuf, ModelLoadError> {
        let name = kind.file_name();
        let url = artifact_url(&self.base_url, name);
        let progress: Option<ProgressFn> = self.progress.clone().map(|cb| {
            Box::new(move |done: u64, total: u64| cb(kind, done, total)) as ProgressFn
        });
        let bundled = self.bundled_dir.as_deref();

        let resolved = match &self.cache_dir {
            Some(dir) => model_resolver::resolve_in(dir, name, &url, bundled, progress),
            None => model_resolver::resolve(name, &url, bundled, progress),
        };
        resolved.map_err(|e| ModelLoadError::Fetch {
            model: kind,
            message: e.to_string(),
        })
    }

    fn open<T>(
        &self,
        kind: ModelKind,
        build: impl FnOnce(&Path) -> Result<T, Box<dyn std::error::Error>>,
    ) -> Result<T, ModelLoadError> {
        let path = self.fetch(kind)?;
        log::debug!("Opening {kind} model at {}", path.display());
        build(&path).map_err(|e| ModelLoadError::Parse {
            model: kind,
            message: e.to_string(),
        })
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load_detector(&self) -> Result<Box<dyn FaceDetector>, ModelLoadError> {
        let confidence = self.confidence;
        self.open(ModelKind::FaceDetector, |p| {
            Ok(Box::new(OnnxBlazefaceDetector::new(p, confidence)?) as Box<dyn FaceDetector>)
        })
    }

    fn load_landmarks(&self) -> Result<Box<dyn LandmarkNet>, ModelLoadError> {
        self.open(ModelKind::FaceLandmark68, |p| {
            Ok(Box::new(OnnxLandmarkNet::new(p)?) as Box<dyn LandmarkNet>)
        })
    }

    fn load_expressions(&self) -> Result<Box<dyn ExpressionNet>, ModelLoadError> {
        self.open(ModelKind::FaceExpression, |p| {
            Ok(Box::new(OnnxExpressionNet::new(p)?) as Box<dyn ExpressionNet>)
        })
    }

    fn load_age_gender(&self) -> Result<Box<dyn AgeGenderNet>, ModelLoadError> {
        self.open(ModelKind::AgeGender, |p| {
            Ok(Box::new(OnnxAgeGenderNet::new(p)?) as Box<dyn AgeGenderNet>)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader(cache: &Path, bundled: Option<PathBuf>) -> OnnxModelLoader {
        let config = AnalyzerConfig {
            // Nothing listens here; any download attempt fails fast.
            model_base_url: "http://127.0.0.1:9".into(),
            bundled_model_dir: bundled,
            ..AnalyzerConfig::default()
        };
        OnnxModelLoader::new(&config).with_cache_dir(cache.to_path_buf())
    }

    #[test]
    fn test_fetch_prefers_cached_artifact() {
        let cache = tempfile::tempdir().unwrap();
        let cached = cache.path().join(ModelKind::AgeGender.file_name());
        std::fs::write(&cached, b"onnx").unwrap();

        let path = loader(cache.path(), None).fetch(ModelKind::AgeGender).unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    fn test_fetch_uses_bundled_dir() {
        let cache = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        let file = bundled.path().join(ModelKind::FaceExpression.file_name());
        std::fs::write(&file, b"onnx").unwrap();

        let path = loader(cache.path(), Some(bundled.path().to_path_buf()))
            .fetch(ModelKind::FaceExpression)
            .unwrap();
        assert_eq!(path, file);
    }

    #[test]
    fn test_unreachable_host_is_fetch_error() {
        let cache = tempfile::tempdir().unwrap();
        let err = loader(cache.path(), None)
            .fetch(ModelKind::FaceLandmark68)
            .unwrap_err();
        assert!(matches!(
            err,
            ModelLoadError::Fetch {
                model: ModelKind::FaceLandmark68,
                ..
            }
        ));
    }

    #[test]
    fn test_corrupt_artifact_is_parse_error() {
        let cache = tempfile::tempdir().unwrap();
        std::fs::write(
            cache.path().join(ModelKind::FaceDetector.file_name()),
            b"not a model",
        )
        .unwrap();

        let err = loader(cache.path(), None).load_detector().err().unwrap();
        assert!(matches!(
            err,
            ModelLoadError::Parse {
                model: ModelKind::FaceDetector,
                ..
            }
        ));
    }
}
