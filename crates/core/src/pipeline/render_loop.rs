//! Continuous capture → detect → draw → publish loop for a live session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::capture::domain::capture_device::{CaptureError, SharedStream};
use crate::overlay::domain::overlay_surface::{draw_detection, OverlaySurface};
use crate::overlay::infrastructure::rgba_overlay::compose;
use crate::pipeline::analysis_sink::{AnalysisUpdate, SharedSink};
use crate::pipeline::detect_face_use_case::DetectFaceUseCase;
use crate::shared::frame::Frame;

/// Per-iteration timings and counters, logged when the loop stops.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoopStats {
    pub iterations: usize,
    pub faces: usize,
    pub detection_errors: usize,
    pub capture_errors: usize,
    pub capture_ms: f64,
    pub detect_ms: f64,
    pub draw_ms: f64,
}

impl LoopStats {
    pub fn summary(&self) -> String {
        let n = self.iterations.max(1) as f64;
        format!(
            "{} iterations, {} with a face, {} detection errors, {} capture errors; \
             avg capture {:.1}ms, detect {:.1}ms, draw {:.1}ms",
            self.iterations,
            self.faces,
            self.detection_errors,
            self.capture_errors,
            self.capture_ms / n,
            self.detect_ms / n,
            self.draw_ms / n,
        )
    }
}

/// A running loop. Iterations run strictly one after another on a single
/// worker thread; [`RenderLoop::stop`] cancels and joins it.
pub struct RenderLoop {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<LoopStats>>,
}

impl RenderLoop {
    pub fn start(
        stream: SharedStream,
        detector: Arc<DetectFaceUseCase>,
        surface: Box<dyn OverlaySurface>,
        sink: SharedSink,
        frame_interval: Duration,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let worker = Worker {
            stream,
            detector,
            surface,
            sink,
            frame_interval,
            cancel: cancel.clone(),
            stats: LoopStats::default(),
        };
        let handle = thread::spawn(move || worker.run());
        log::info!("Render loop started");
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Cancels the loop and waits for the worker to exit. Once this returns
    /// no further detection, draw or publish happens. Idempotent.
    pub fn stop(&mut self) -> Option<LoopStats> {
        let handle = self.handle.take()?;
        self.cancel.store(true, Ordering::SeqCst);
        handle.thread().unpark();
        match handle.join() {
            Ok(stats) => {
                log::info!("Render loop stopped: {}", stats.summary());
                Some(stats)
            }
            Err(_) => {
                log::warn!("Render loop worker panicked");
                None
            }
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    stream: SharedStream,
    detector: Arc<DetectFaceUseCase>,
    surface: Box<dyn OverlaySurface>,
    sink: SharedSink,
    frame_interval: Duration,
    cancel: Arc<AtomicBool>,
    stats: LoopStats,
}

impl Worker {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    fn run(mut self) -> LoopStats {
        while !self.cancelled() {
            let started = Instant::now();
            if !self.iterate() {
                break;
            }
            self.stats.iterations += 1;
            self.pace(started);
        }
        self.stats
    }

    /// One capture/detect/draw/publish pass. Returns `false` if cancelled
    /// partway through; nothing is drawn or published in that case.
    fn iterate(&mut self) -> bool {
        let capture_started = Instant::now();
        let captured = match self.stream.lock() {
            Ok(mut stream) => stream.read_frame(),
            Err(_) => Err(CaptureError::Closed),
        };
        let capture_ms = elapsed_ms(capture_started);
        self.stats.capture_ms += capture_ms;

        let frame = match captured {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Frame capture failed: {e}");
                self.stats.capture_errors += 1;
                if self.cancelled() {
                    return false;
                }
                self.sink.publish(AnalysisUpdate::cleared());
                return true;
            }
        };

        if self.cancelled() {
            return false;
        }
        if !self.detector.is_ready() {
            self.show_unanalyzed(frame);
            return true;
        }
        let t = Instant::now();
        let result = self.detector.detect_one(&frame);
        let detect_ms = elapsed_ms(t);
        self.stats.detect_ms += detect_ms;
        if self.cancelled() {
            return false;
        }

        let t = Instant::now();
        let size = (frame.width(), frame.height());
        let frame_index = frame.index();
        let update = match result {
            Ok(Some(face)) => {
                self.stats.faces += 1;
                draw_detection(self.surface.as_mut(), size, &face.detection);
                AnalysisUpdate {
                    analysis: Some(face.analysis),
                    frame: Some(self.display(&frame)),
                }
            }
            Ok(None) => {
                self.surface.resize(size.0, size.1);
                self.surface.clear();
                AnalysisUpdate {
                    analysis: None,
                    frame: Some(frame),
                }
            }
            Err(e) => {
                log::warn!("Detection failed: {e}");
                self.stats.detection_errors += 1;
                self.surface.resize(size.0, size.1);
                self.surface.clear();
                AnalysisUpdate {
                    analysis: None,
                    frame: Some(frame),
                }
            }
        };
        let draw_ms = elapsed_ms(t);
        self.stats.draw_ms += draw_ms;
        log::debug!(
            "Frame {frame_index}: capture {capture_ms:.1}ms, detect {detect_ms:.1}ms, draw {draw_ms:.1}ms"
        );
        self.sink.publish(update);
        true
    }

    /// Models are still loading: kick off loading in the background and show
    /// the bare frame, so stopping never waits on a download.
    fn show_unanalyzed(&mut self, frame: Frame) {
        if let Some(e) = self.detector.warm_up() {
            log::warn!("Model loading failed: {e}");
            self.stats.detection_errors += 1;
        }
        self.surface.resize(frame.width(), frame.height());
        self.surface.clear();
        self.sink.publish(AnalysisUpdate {
            analysis: None,
            frame: Some(frame),
        });
    }

    fn display(&self, frame: &Frame) -> Frame {
        match self.surface.render() {
            Some(overlay) => compose(frame, &overlay),
            None => frame.clone(),
        }
    }

    /// Sleeps out the rest of the frame interval; `stop` unparks early.
    fn pace(&self, started: Instant) {
        let deadline = started + self.frame_interval;
        while !self.cancelled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::park_timeout(deadline - now);
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
