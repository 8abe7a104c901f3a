use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use facelens_core::capture::domain::capture_device::{CaptureDevice, FacingMode};
use facelens_core::capture::domain::stream_session::StreamSession;
use facelens_core::pipeline::analysis_sink::AnalysisUpdate;
use facelens_core::pipeline::detect_face_use_case::DetectFaceUseCase;
use facelens_core::pipeline::live_session_use_case::LiveSessionUseCase;

pub enum LiveCommand {
    CameraOn,
    CameraOff,
    Flip,
    Shutdown,
}

pub enum LiveMessage {
    Active(FacingMode),
    Inactive(FacingMode),
    Update(AnalysisUpdate),
    Error(String),
}

/// Owns the live session on its own thread so opening a camera never blocks
/// the UI. Dropping the worker turns the camera off.
pub struct LiveWorker {
    commands: Sender<LiveCommand>,
    messages: Receiver<LiveMessage>,
}

impl LiveWorker {
    pub fn spawn(
        device: Box<dyn CaptureDevice>,
        facing: FacingMode,
        detector: Arc<DetectFaceUseCase>,
        frame_interval: Duration,
    ) -> Self {
        let (commands, command_rx) = crossbeam_channel::unbounded::<LiveCommand>();
        let (tx, messages) = crossbeam_channel::unbounded::<LiveMessage>();

        thread::spawn(move || {
            let sink_tx = tx.clone();
            let sink = Arc::new(move |update: AnalysisUpdate| {
                let _ = sink_tx.send(LiveMessage::Update(update));
            });
            let session = StreamSession::new(device, facing);
            let mut live = LiveSessionUseCase::new(session, detector, sink, frame_interval);
            run(&mut live, &command_rx, &tx);
        });

        Self { commands, messages }
    }

    pub fn send(&self, command: LiveCommand) {
        let _ = self.commands.send(command);
    }

    /// Everything the worker has published since the last call.
    pub fn drain(&self) -> Vec<LiveMessage> {
        self.messages.try_iter().collect()
    }
}

/// Asks the thread to shut down. Does not wait for it.
impl Drop for LiveWorker {
    fn drop(&mut self) {
        self.send(LiveCommand::Shutdown);
    }
}

fn run(live: &mut LiveSessionUseCase, commands: &Receiver<LiveCommand>, tx: &Sender<LiveMessage>) {
    while let Ok(command) = commands.recv() {
        let result = match command {
            LiveCommand::CameraOn => live.camera_on(),
            LiveCommand::CameraOff => {
                live.camera_off();
                Ok(())
            }
            LiveCommand::Flip => live.flip_camera(),
            LiveCommand::Shutdown => break,
        };
        let message = match result {
            Ok(()) if live.is_active() => LiveMessage::Active(live.facing_mode()),
            Ok(()) => LiveMessage::Inactive(live.facing_mode()),
            Err(e) => {
                log::warn!("Camera error: {e}");
                LiveMessage::Error(e.to_string())
            }
        };
        let _ = tx.send(message);
    }
    live.camera_off();
}
