//! Physical camera capture through `nokhwa`.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{Camera, NokhwaError};

use crate::capture::domain::capture_device::{
    CaptureDevice, CaptureError, CaptureStream, FacingMode,
};
use crate::shared::config::AnalyzerConfig;
use crate::shared::frame::Frame;

/// A camera visible to the platform backend.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
}

pub fn list_cameras() -> Result<Vec<CameraInfo>, CaptureError> {
    let devices = nokhwa::query(ApiBackend::Auto).map_err(map_error)?;
    Ok(devices
        .iter()
        .enumerate()
        .map(|(idx, info)| CameraInfo {
            index: idx as u32,
            name: info.human_name().to_string(),
        })
        .collect())
}

/// Opens cameras by device index, mapping each facing mode to a
/// configured index.
pub struct NokhwaCameraDevice {
    user_index: u32,
    environment_index: u32,
}

impl NokhwaCameraDevice {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            user_index: config.device_index(FacingMode::User),
            environment_index: config.device_index(FacingMode::Environment),
        }
    }

    fn index_for(&self, facing: FacingMode) -> u32 {
        match facing {
            FacingMode::User => self.user_index,
            FacingMode::Environment => self.environment_index,
        }
    }
}

impl CaptureDevice for NokhwaCameraDevice {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let index = self.index_for(facing);
        let available = list_cameras()?;
        if !available.iter().any(|c| c.index == index) {
            return Err(CaptureError::NoDevice(facing));
        }
        Ok(Box::new(NokhwaStream::spawn(index)?))
    }
}

/// A camera owned by its own thread. Some backends (AVFoundation, Media
/// Foundation) only allow a camera handle on the thread that opened it, so
/// that thread opens, reads and closes it; callers exchange frames over
/// channels.
struct NokhwaStream {
    index: u32,
    requests: Option<Sender<()>>,
    frames: Receiver<Result<Frame, CaptureError>>,
    handle: Option<JoinHandle<()>>,
}

impl NokhwaStream {
    /// Starts the camera thread and waits until the camera is open.
    fn spawn(index: u32) -> Result<Self, CaptureError> {
        let (opened_tx, opened_rx) = crossbeam_channel::bounded(1);
        let (requests, request_rx) = crossbeam_channel::unbounded::<()>();
        let (frame_tx, frames) = crossbeam_channel::bounded(1);

        let handle = thread::Builder::new()
            .name(format!("camera-{index}"))
            .spawn(move || {
                let mut camera = match open_camera(index) {
                    Ok(camera) => {
                        let _ = opened_tx.send(Ok(()));
                        camera
                    }
                    Err(e) => {
                        let _ = opened_tx.send(Err(e));
                        return;
                    }
                };
                let mut frame_index = 0;
                for () in request_rx.iter() {
                    let result = read_camera(&mut camera, frame_index);
                    if result.is_ok() {
                        frame_index += 1;
                    }
                    if frame_tx.send(result).is_err() {
                        break;
                    }
                }
                if let Err(e) = camera.stop_stream() {
                    log::warn!("Failed to stop camera {index}: {e}");
                }
            })
            .map_err(|e| CaptureError::Backend(e.to_string()))?;

        let opened = opened_rx
            .recv()
            .unwrap_or_else(|_| Err(CaptureError::Backend("camera thread exited".into())));
        if let Err(e) = opened {
            let _ = handle.join();
            return Err(e);
        }
        Ok(Self {
            index,
            requests: Some(requests),
            frames,
            handle: Some(handle),
        })
    }
}

fn open_camera(index: u32) -> Result<Camera, CaptureError> {
    let requested =
        RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
    let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(map_error)?;
    camera.open_stream().map_err(map_error)?;

    let resolution = camera.resolution();
    log::info!(
        "Camera {index} opened: {}x{} @ {} fps",
        resolution.width(),
        resolution.height(),
        camera.frame_rate()
    );
    Ok(camera)
}

fn read_camera(camera: &mut Camera, frame_index: usize) -> Result<Frame, CaptureError> {
    let buffer = camera.frame().map_err(map_error)?;
    let decoded = buffer.decode_image::<RgbFormat>().map_err(map_error)?;
    let (width, height) = (decoded.width(), decoded.height());
    Ok(Frame::new(decoded.into_raw(), width, height, 3, frame_index))
}

impl CaptureStream for NokhwaStream {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let requests = self.requests.as_ref().ok_or(CaptureError::Closed)?;
        requests.send(()).map_err(|_| CaptureError::Closed)?;
        self.frames.recv().map_err(|_| CaptureError::Closed)?
    }

    /// Ends the camera thread and waits for it to release the device.
    fn stop(&mut self) {
        if self.requests.take().is_none() {
            return;
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Camera {} thread panicked", self.index);
            }
        }
    }

    fn is_live(&self) -> bool {
        self.requests.is_some()
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn map_error(err: NokhwaError) -> CaptureError {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized")
    {
        CaptureError::PermissionDenied(message)
    } else {
        CaptureError::Backend(message)
    }
}
