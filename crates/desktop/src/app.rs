use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use iced::widget::{column, container, image, text};
use iced::{Element, Length, Subscription, Task, Theme};

use facelens_core::capture::domain::capture_device::FacingMode;
use facelens_core::capture::infrastructure::nokhwa_camera::NokhwaCameraDevice;
use facelens_core::detection::domain::face_analysis::FrameAnalysis;
use facelens_core::shared::config::AnalyzerConfig;
use facelens_core::shared::constants::IMAGE_EXTENSIONS;

use crate::pages;
use crate::settings::{Appearance, Settings};
use crate::theme;
use crate::widgets::frame_view::frame_handle;
use crate::workers::analyze_worker::{AnalyzeCommand, AnalyzeMessage, AnalyzeWorker};
use crate::workers::live_worker::{LiveCommand, LiveMessage, LiveWorker};
use crate::workers::model_cache::{ModelCache, ModelStatus};

const TICK_INTERVAL: Duration = Duration::from_millis(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    Live,
    Upload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonId {
    LiveFace,
    ImageUpload,
    CameraToggle,
    FlipCamera,
    SelectImage,
    Analyze,
}

#[derive(Debug, Clone)]
pub enum Message {
    Navigate(Page),
    ToggleCamera,
    FlipCamera,
    SelectImage,
    ImageSelected(Option<PathBuf>),
    Analyze,
    Tick,
    ButtonHover(ButtonId, bool),
    ConfidenceChanged(u32),
    FacingModeChanged(FacingMode),
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    FontScaleChanged(f32),
    PollSystemTheme,
}

#[derive(Default)]
pub struct LiveState {
    pub active: bool,
    /// A camera command was sent and has not been answered yet.
    pub pending: bool,
    pub facing: FacingMode,
    pub frame: Option<image::Handle>,
    pub analysis: Option<FrameAnalysis>,
    pub error: Option<String>,
}

#[derive(Default)]
pub struct UploadState {
    pub image: Option<image::Handle>,
    pub analysis: Option<FrameAnalysis>,
    pub busy: bool,
    pub notice: Option<String>,
}

pub struct App {
    pub page: Page,
    pub settings: Settings,
    pub model_status: ModelStatus,
    pub live: LiveState,
    pub upload: UploadState,
    pub hovered: Option<ButtonId>,
    config: AnalyzerConfig,
    models: Arc<ModelCache>,
    live_worker: Option<LiveWorker>,
    analyze_worker: Option<AnalyzeWorker>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();
        let config = settings.analyzer_config();
        let models = ModelCache::new(&config);
        (
            Self {
                page: Page::Home,
                model_status: models.status(),
                live: LiveState {
                    facing: settings.facing_mode,
                    ..LiveState::default()
                },
                upload: UploadState::default(),
                hovered: None,
                settings,
                config,
                models,
                live_worker: None,
                analyze_worker: None,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Navigate(page) => self.navigate(page),
            Message::ToggleCamera => {
                if let (Some(worker), false) = (&self.live_worker, self.live.pending) {
                    worker.send(if self.live.active {
                        LiveCommand::CameraOff
                    } else {
                        LiveCommand::CameraOn
                    });
                    self.live.pending = true;
                }
            }
            Message::FlipCamera => {
                if let (Some(worker), true, false) =
                    (&self.live_worker, self.live.active, self.live.pending)
                {
                    worker.send(LiveCommand::Flip);
                    self.live.pending = true;
                }
            }
            Message::SelectImage => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select an image")
                            .add_filter("Images", IMAGE_EXTENSIONS)
                            .pick_file()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::ImageSelected,
                );
            }
            Message::ImageSelected(Some(path)) => {
                if let Some(worker) = &self.analyze_worker {
                    self.upload.analysis = None;
                    self.upload.notice = None;
                    worker.send(AnalyzeCommand::Select(path));
                }
            }
            Message::ImageSelected(None) => {}
            Message::Analyze => {
                if let (Some(worker), Some(_), false) =
                    (&self.analyze_worker, &self.upload.image, self.upload.busy)
                {
                    self.upload.busy = true;
                    self.upload.notice = None;
                    worker.send(AnalyzeCommand::Analyze);
                }
            }
            Message::Tick => self.drain_workers(),
            Message::ButtonHover(id, true) => self.hovered = Some(id),
            Message::ButtonHover(id, false) => {
                if self.hovered == Some(id) {
                    self.hovered = None;
                }
            }
            Message::ConfidenceChanged(val) => {
                self.settings.confidence = val;
                self.settings.save();
            }
            Message::FacingModeChanged(facing) => {
                self.settings.facing_mode = facing;
                self.settings.save();
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::FontScaleChanged(scale) => {
                self.settings.font_scale = scale;
                self.settings.save();
            }
            Message::PollSystemTheme => {}
        }
        Task::none()
    }

    fn navigate(&mut self, page: Page) {
        if page == self.page {
            return;
        }
        // Dropping the workers turns the camera off and ends any analysis.
        self.live_worker = None;
        self.analyze_worker = None;
        self.live = LiveState {
            facing: self.settings.facing_mode,
            ..LiveState::default()
        };
        self.upload = UploadState::default();
        self.hovered = None;

        match page {
            Page::Home => {}
            Page::Live => {
                self.live_worker = Some(LiveWorker::spawn(
                    Box::new(NokhwaCameraDevice::new(&self.config)),
                    self.settings.facing_mode,
                    self.models.detector(),
                    self.config.frame_interval,
                ));
            }
            Page::Upload => {
                self.analyze_worker = Some(AnalyzeWorker::spawn(self.models.detector()));
            }
        }
        self.page = page;
    }

    fn drain_workers(&mut self) {
        self.model_status = self.models.status();

        if let Some(worker) = &self.live_worker {
            let mut latest = None;
            for message in worker.drain() {
                match message {
                    LiveMessage::Active(facing) => {
                        self.live.active = true;
                        self.live.pending = false;
                        self.live.facing = facing;
                        self.live.error = None;
                    }
                    LiveMessage::Inactive(facing) => {
                        self.live.active = false;
                        self.live.pending = false;
                        self.live.facing = facing;
                        latest = None;
                        self.live.frame = None;
                        self.live.analysis = None;
                    }
                    LiveMessage::Update(update) => latest = Some(update),
                    LiveMessage::Error(e) => {
                        self.live.active = false;
                        self.live.pending = false;
                        self.live.error = Some(e);
                    }
                }
            }
            if let Some(update) = latest {
                self.live.frame = update.frame.as_ref().map(frame_handle);
                self.live.analysis = update.analysis;
            }
        }

        if let Some(worker) = &self.analyze_worker {
            for message in worker.drain() {
                match message {
                    AnalyzeMessage::Update(update) => {
                        self.upload.image = update.frame.as_ref().map(frame_handle);
                        self.upload.analysis = update.analysis;
                    }
                    AnalyzeMessage::Started => self.upload.busy = true,
                    AnalyzeMessage::Finished { found } => {
                        self.upload.busy = false;
                        if !found {
                            self.upload.notice = Some("No face detected".into());
                        }
                    }
                    AnalyzeMessage::Error(e) => {
                        self.upload.busy = false;
                        self.upload.notice = Some(e);
                    }
                }
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;
        let theme = self.theme();

        let content: Element<'_, Message> = match self.page {
            Page::Home => pages::home::view(self),
            Page::Live => pages::live::view(self, &theme),
            Page::Upload => pages::upload::view(self, &theme),
        };

        let status_line = container(
            text(self.model_status.describe())
                .size(scaled(11.0, fs))
                .color(theme::muted_color(&theme)),
        )
        .width(Length::Fill)
        .center_x(Length::Fill)
        .padding([4, 0]);

        column![
            container(content).padding(16).height(Length::Fill),
            status_line
        ]
        .height(Length::Fill)
        .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let loading = matches!(self.model_status, ModelStatus::Loading { .. });
        let tick = if self.page != Page::Home || loading {
            iced::time::every(TICK_INTERVAL).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };
        let system_theme = if self.settings.appearance == Appearance::System {
            iced::time::every(Duration::from_secs(2)).map(|_| Message::PollSystemTheme)
        } else {
            Subscription::none()
        };
        Subscription::batch([tick, system_theme])
    }
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}
