use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use facelens_core::overlay::infrastructure::rgba_overlay::RgbaOverlay;
use facelens_core::pipeline::analysis_sink::AnalysisUpdate;
use facelens_core::pipeline::analyze_image_use_case::AnalyzeImageUseCase;
use facelens_core::pipeline::detect_face_use_case::DetectFaceUseCase;

pub enum AnalyzeCommand {
    Select(PathBuf),
    Analyze,
    Shutdown,
}

pub enum AnalyzeMessage {
    Update(AnalysisUpdate),
    Started,
    Finished { found: bool },
    Error(String),
}

/// Runs single-image analysis off the UI thread.
pub struct AnalyzeWorker {
    commands: Sender<AnalyzeCommand>,
    messages: Receiver<AnalyzeMessage>,
}

impl AnalyzeWorker {
    pub fn spawn(detector: Arc<DetectFaceUseCase>) -> Self {
        let (commands, command_rx) = crossbeam_channel::unbounded::<AnalyzeCommand>();
        let (tx, messages) = crossbeam_channel::unbounded::<AnalyzeMessage>();

        thread::spawn(move || {
            let sink_tx = tx.clone();
            let sink = Arc::new(move |update: AnalysisUpdate| {
                let _ = sink_tx.send(AnalyzeMessage::Update(update));
            });
            let mut use_case =
                AnalyzeImageUseCase::new(detector, Box::new(RgbaOverlay::new(0, 0)), sink);
            run(&mut use_case, &command_rx, &tx);
        });

        Self { commands, messages }
    }

    pub fn send(&self, command: AnalyzeCommand) {
        let _ = self.commands.send(command);
    }

    pub fn drain(&self) -> Vec<AnalyzeMessage> {
        self.messages.try_iter().collect()
    }
}

/// Asks the thread to shut down. Does not wait for it.
impl Drop for AnalyzeWorker {
    fn drop(&mut self) {
        self.send(AnalyzeCommand::Shutdown);
    }
}

fn run(
    use_case: &mut AnalyzeImageUseCase,
    commands: &Receiver<AnalyzeCommand>,
    tx: &Sender<AnalyzeMessage>,
) {
    while let Ok(command) = commands.recv() {
        match command {
            AnalyzeCommand::Select(path) => {
                if let Err(e) = use_case.select_image_file(&path) {
                    let _ = tx.send(AnalyzeMessage::Error(e.to_string()));
                }
            }
            AnalyzeCommand::Analyze => {
                let _ = tx.send(AnalyzeMessage::Started);
                let message = match use_case.analyze() {
                    Ok(result) => AnalyzeMessage::Finished {
                        found: result.is_some(),
                    },
                    Err(e) => AnalyzeMessage::Error(e.to_string()),
                };
                let _ = tx.send(message);
            }
            AnalyzeCommand::Shutdown => break,
        }
    }
}
