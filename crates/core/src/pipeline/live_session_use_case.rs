use std::sync::Arc;
use std::time::Duration;

use crate::capture::domain::capture_device::{CaptureError, FacingMode, SharedStream};
use crate::capture::domain::stream_session::StreamSession;
use crate::overlay::domain::overlay_surface::OverlaySurface;
use crate::overlay::infrastructure::rgba_overlay::RgbaOverlay;
use crate::pipeline::analysis_sink::{AnalysisUpdate, SharedSink};
use crate::pipeline::detect_face_use_case::DetectFaceUseCase;
use crate::pipeline::render_loop::{LoopStats, RenderLoop};

pub type SurfaceFactory = Box<dyn Fn() -> Box<dyn OverlaySurface> + Send>;

/// Camera on/off/flip for the live view: a capture session driving a
/// render loop.
pub struct LiveSessionUseCase {
    session: StreamSession,
    detector: Arc<DetectFaceUseCase>,
    sink: SharedSink,
    frame_interval: Duration,
    new_surface: SurfaceFactory,
    render_loop: Option<RenderLoop>,
}

impl LiveSessionUseCase {
    pub fn new(
        session: StreamSession,
        detector: Arc<DetectFaceUseCase>,
        sink: SharedSink,
        frame_interval: Duration,
    ) -> Self {
        Self {
            session,
            detector,
            sink,
            frame_interval,
            new_surface: Box::new(|| Box::new(RgbaOverlay::new(0, 0)) as Box<dyn OverlaySurface>),
            render_loop: None,
        }
    }

    /// Replaces the overlay created for each new loop.
    pub fn with_surface(mut self, factory: SurfaceFactory) -> Self {
        self.new_surface = factory;
        self
    }

    pub fn is_active(&self) -> bool {
        self.render_loop.is_some()
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.session.facing_mode()
    }

    /// Starts capture, then the loop. No-op when already on.
    pub fn camera_on(&mut self) -> Result<(), CaptureError> {
        if self.is_active() {
            return Ok(());
        }
        let stream = self.session.start()?;
        self.start_loop(stream);
        Ok(())
    }

    /// Stops the loop (cancel and join), then the capture, then clears the
    /// displayed result.
    pub fn camera_off(&mut self) -> Option<LoopStats> {
        let stats = self.render_loop.take().and_then(|mut l| l.stop());
        self.session.stop();
        self.sink.publish(AnalysisUpdate::cleared());
        stats
    }

    /// Camera off, toggle facing mode, camera on.
    pub fn flip_camera(&mut self) -> Result<(), CaptureError> {
        self.camera_off();
        let stream = self.session.flip()?;
        self.start_loop(stream);
        Ok(())
    }

    fn start_loop(&mut self, stream: SharedStream) {
        self.render_loop = Some(RenderLoop::start(
            stream,
            self.detector.clone(),
            (self.new_surface)(),
            self.sink.clone(),
            self.frame_interval,
        ));
    }
}

impl Drop for LiveSessionUseCase {
    fn drop(&mut self) {
        if self.is_active() || self.session.is_active() {
            self.camera_off();
        }
    }
}
