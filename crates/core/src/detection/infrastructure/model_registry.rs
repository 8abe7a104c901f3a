//! Process-wide, idempotent loading of the four analysis models.
//!
//! Concurrent [`ModelRegistry::ensure_loaded`] calls share one in-flight
//! attempt. Models that loaded successfully are kept across failed
//! attempts, so a retry only fetches what is still missing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;

use crate::detection::domain::age_gender::AgeGenderNet;
use crate::detection::domain::expression::ExpressionNet;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_landmarks::LandmarkNet;
use crate::detection::domain::model_loader::{ModelKind, ModelLoadError, ModelLoader};
use crate::detection::domain::model_set::ModelSet;

pub type SharedModels = Arc<Mutex<ModelSet>>;

pub struct ModelRegistry {
    loader: Box<dyn ModelLoader>,
    state: Mutex<RegistryState>,
    changed: Condvar,
    ready: AtomicBool,
}

#[derive(Default)]
struct RegistryState {
    slots: Slots,
    models: Option<SharedModels>,
    loading: bool,
    attempt: u64,
    failure: Option<(u64, ModelLoadError)>,
}

#[derive(Default)]
struct Slots {
    detector: Option<Box<dyn FaceDetector>>,
    landmarks: Option<Box<dyn LandmarkNet>>,
    expressions: Option<Box<dyn ExpressionNet>>,
    age_gender: Option<Box<dyn AgeGenderNet>>,
}

impl Slots {
    fn is_loaded(&self, kind: ModelKind) -> bool {
        match kind {
            ModelKind::FaceDetector => self.detector.is_some(),
            ModelKind::FaceLandmark68 => self.landmarks.is_some(),
            ModelKind::FaceExpression => self.expressions.is_some(),
            ModelKind::AgeGender => self.age_gender.is_some(),
        }
    }

    fn missing(&self) -> Vec<ModelKind> {
        ModelKind::ALL
            .into_iter()
            .filter(|k| !self.is_loaded(*k))
            .collect()
    }

    fn store(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Detector(m) => self.detector = Some(m),
            Loaded::Landmarks(m) => self.landmarks = Some(m),
            Loaded::Expressions(m) => self.expressions = Some(m),
            Loaded::AgeGender(m) => self.age_gender = Some(m),
        }
    }

    /// Moves all four handles into a [`ModelSet`] when every slot is filled.
    fn take_complete(&mut self) -> Option<ModelSet> {
        if !self.missing().is_empty() {
            return None;
        }
        Some(ModelSet {
            detector: self.detector.take()?,
            landmarks: self.landmarks.take()?,
            expressions: self.expressions.take()?,
            age_gender: self.age_gender.take()?,
        })
    }
}

enum Loaded {
    Detector(Box<dyn FaceDetector>),
    Landmarks(Box<dyn LandmarkNet>),
    Expressions(Box<dyn ExpressionNet>),
    AgeGender(Box<dyn AgeGenderNet>),
}

impl ModelRegistry {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            state: Mutex::new(RegistryState::default()),
            changed: Condvar::new(),
            ready: AtomicBool::new(false),
        }
    }

    /// True once all four models are loaded. Never reverts.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self, kind: ModelKind) -> bool {
        if self.is_ready() {
            return true;
        }
        self.lock().map(|s| s.slots.is_loaded(kind)).unwrap_or(false)
    }

    /// Loads whichever models are missing, in parallel, and returns the
    /// shared set.
    ///
    /// Callers arriving while an attempt is in flight wait for it and get
    /// its outcome. A failed attempt is reported to all of them and the
    /// next call starts a fresh attempt.
    pub fn ensure_loaded(&self) -> Result<SharedModels, ModelLoadError> {
        let mut state = self.lock()?;
        loop {
            if let Some(models) = &state.models {
                return Ok(models.clone());
            }
            if !state.loading {
                break;
            }
            let attempt = state.attempt;
            while state.loading && state.attempt == attempt {
                state = self
                    .changed
                    .wait(state)
                    .map_err(|_| ModelLoadError::Interrupted)?;
            }
            if let Some((failed, err)) = &state.failure {
                if *failed == attempt {
                    return Err(err.clone());
                }
            }
        }

        state.loading = true;
        state.attempt += 1;
        let attempt = state.attempt;
        let missing = state.slots.missing();
        drop(state);

        log::info!("Loading models: {missing:?}");
        let results = self.load_all(&missing);

        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut first_error = None;
        for result in results {
            match result {
                Ok(loaded) => state.slots.store(loaded),
                Err(e) => {
                    log::warn!("Model load failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        let outcome = match first_error {
            Some(err) => {
                state.failure = Some((attempt, err.clone()));
                Err(err)
            }
            None => match state.slots.take_complete() {
                Some(set) => {
                    let models = Arc::new(Mutex::new(set));
                    state.models = Some(models.clone());
                    state.failure = None;
                    self.ready.store(true, Ordering::Release);
                    log::info!("All models loaded");
                    Ok(models)
                }
                None => {
                    state.failure = Some((attempt, ModelLoadError::Interrupted));
                    Err(ModelLoadError::Interrupted)
                }
            },
        };
        state.loading = false;
        drop(state);
        self.changed.notify_all();
        outcome
    }

    /// Loads each kind on its own scoped thread. Results come back in the
    /// order of `kinds`; a panicking loader counts as interrupted.
    fn load_all(&self, kinds: &[ModelKind]) -> Vec<Result<Loaded, ModelLoadError>> {
        let loader = self.loader.as_ref();
        thread::scope(|scope| {
            let handles: Vec<_> = kinds
                .iter()
                .map(|&kind| scope.spawn(move || load_one(loader, kind)))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or(Err(ModelLoadError::Interrupted)))
                .collect()
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegistryState>, ModelLoadError> {
        self.state.lock().map_err(|_| ModelLoadError::Interrupted)
    }
}

fn load_one(loader: &dyn ModelLoader, kind: ModelKind) -> Result<Loaded, ModelLoadError> {
    Ok(match kind {
        ModelKind::FaceDetector => Loaded::Detector(loader.load_detector()?),
        ModelKind::FaceLandmark68 => Loaded::Landmarks(loader.load_landmarks()?),
        ModelKind::FaceExpression => Loaded::Expressions(loader.load_expressions()?),
        ModelKind::AgeGender => Loaded::AgeGender(loader.load_age_gender()?),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::detection::domain::model_set::stubs::{
        CenterLandmarks, FixedAgeGender, FixedExpressions, StubDetector,
    };
    use crate::detection::domain::expression::Expression;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Loader returning stub nets, counting calls per kind.
    #[derive(Default)]
    pub struct CountingLoader {
        pub calls: [AtomicUsize; 4],
        pub failing: Mutex<HashSet<ModelKind>>,
        pub delay: Duration,
    }

    impl CountingLoader {
        pub fn calls(&self, kind: ModelKind) -> usize {
            self.calls[kind.index()].load(Ordering::SeqCst)
        }

        fn enter(&self, kind: ModelKind) -> Result<(), ModelLoadError> {
            self.calls[kind.index()].fetch_add(1, Ordering::SeqCst);
            thread::sleep(self.delay);
            if self.failing.lock().unwrap().contains(&kind) {
                return Err(ModelLoadError::Fetch {
                    model: kind,
                    message: "unreachable".into(),
                });
            }
            Ok(())
        }
    }

    impl ModelLoader for Arc<CountingLoader> {
        fn load_detector(&self) -> Result<Box<dyn FaceDetector>, ModelLoadError> {
            self.enter(ModelKind::FaceDetector)?;
            Ok(Box::new(StubDetector { detections: vec![] }))
        }

        fn load_landmarks(&self) -> Result<Box<dyn LandmarkNet>, ModelLoadError> {
            self.enter(ModelKind::FaceLandmark68)?;
            Ok(Box::new(CenterLandmarks))
        }

        fn load_expressions(&self) -> Result<Box<dyn ExpressionNet>, ModelLoadError> {
            self.enter(ModelKind::FaceExpression)?;
            Ok(Box::new(FixedExpressions(vec![(Expression::Neutral, 1.0)])))
        }

        fn load_age_gender(&self) -> Result<Box<dyn AgeGenderNet>, ModelLoadError> {
            self.enter(ModelKind::AgeGender)?;
            Ok(Box::new(FixedAgeGender(30.0)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::CountingLoader;
    use super::*;
    use std::time::Duration;

    fn registry(loader: &Arc<CountingLoader>) -> ModelRegistry {
        ModelRegistry::new(Box::new(loader.clone()))
    }

    #[test]
    fn test_loads_each_model_once() {
        let loader = Arc::new(CountingLoader::default());
        let registry = registry(&loader);

        assert!(!registry.is_ready());
        let first = registry.ensure_loaded().unwrap();
        let second = registry.ensure_loaded().unwrap();

        assert!(registry.is_ready());
        assert!(Arc::ptr_eq(&first, &second));
        for kind in ModelKind::ALL {
            assert_eq!(loader.calls(kind), 1, "{kind}");
            assert!(registry.is_loaded(kind));
        }
    }

    #[test]
    fn test_concurrent_callers_share_one_attempt() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_millis(50),
            ..CountingLoader::default()
        });
        let registry = registry(&loader);

        let sets: Vec<SharedModels> = thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| registry.ensure_loaded())).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        for kind in ModelKind::ALL {
            assert_eq!(loader.calls(kind), 1, "{kind}");
        }
        assert!(sets.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_failure_reaches_all_waiters_and_keeps_loaded_models() {
        let loader = Arc::new(CountingLoader {
            delay: Duration::from_millis(100),
            ..CountingLoader::default()
        });
        loader.failing.lock().unwrap().insert(ModelKind::AgeGender);
        let registry = registry(&loader);

        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| registry.ensure_loaded())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in &results {
            assert!(matches!(
                result,
                Err(ModelLoadError::Fetch {
                    model: ModelKind::AgeGender,
                    ..
                })
            ));
        }
        assert!(!registry.is_ready());
        assert!(registry.is_loaded(ModelKind::FaceDetector));
        assert!(!registry.is_loaded(ModelKind::AgeGender));
        assert_eq!(loader.calls(ModelKind::AgeGender), 1);
    }

    #[test]
    fn test_retry_only_fetches_missing_models() {
        let loader = Arc::new(CountingLoader::default());
        loader.failing.lock().unwrap().insert(ModelKind::FaceExpression);
        let registry = registry(&loader);

        assert!(registry.ensure_loaded().is_err());
        loader.failing.lock().unwrap().clear();
        registry.ensure_loaded().unwrap();

        assert!(registry.is_ready());
        assert_eq!(loader.calls(ModelKind::FaceExpression), 2);
        assert_eq!(loader.calls(ModelKind::FaceDetector), 1);
        assert_eq!(loader.calls(ModelKind::FaceLandmark68), 1);
        assert_eq!(loader.calls(ModelKind::AgeGender), 1);
    }
}
