//! Replays a video file as if it were a camera, decoded with ffmpeg-next.
//!
//! Both facing modes open the same file. Useful without camera hardware.

use std::path::{Path, PathBuf};

use crate::capture::domain::capture_device::{
    CaptureDevice, CaptureError, CaptureStream, FacingMode,
};
use crate::shared::frame::Frame;

pub struct FfmpegFileDevice {
    path: PathBuf,
    looping: bool,
}

impl FfmpegFileDevice {
    /// Replays `path`, restarting from the first frame at end of file when
    /// `looping` is set.
    pub fn new(path: impl Into<PathBuf>, looping: bool) -> Self {
        Self {
            path: path.into(),
            looping,
        }
    }
}

impl CaptureDevice for FfmpegFileDevice {
    fn open(&mut self, facing: FacingMode) -> Result<Box<dyn CaptureStream>, CaptureError> {
        let decoding = Decoding::open(&self.path)?;
        log::info!(
            "Replaying {} as {facing} camera ({}x{})",
            self.path.display(),
            decoding.width,
            decoding.height
        );
        Ok(Box::new(FfmpegFileStream {
            path: self.path.clone(),
            looping: self.looping,
            decoding: Some(decoding),
            frame_index: 0,
        }))
    }
}

struct FfmpegFileStream {
    path: PathBuf,
    looping: bool,
    decoding: Option<Decoding>,
    frame_index: usize,
}

// Safety: the ffmpeg contexts are only touched by whichever thread holds the
// session's stream mutex; the raw pointers are never shared.
unsafe impl Send for FfmpegFileStream {}

impl CaptureStream for FfmpegFileStream {
    fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let mut restarted = false;
        loop {
            let decoding = self.decoding.as_mut().ok_or(CaptureError::Closed)?;
            if let Some(pixels) = decoding.next_rgb()? {
                let frame = Frame::new(
                    pixels,
                    decoding.width,
                    decoding.height,
                    3,
                    self.frame_index,
                );
                self.frame_index += 1;
                return Ok(frame);
            }
            // End of file. A restart that yields nothing means the file has
            // no decodable frames at all.
            if !self.looping || restarted {
                self.decoding = None;
                return Err(CaptureError::Closed);
            }
            log::debug!("Restarting {}", self.path.display());
            self.decoding = Some(Decoding::open(&self.path)?);
            restarted = true;
        }
    }

    fn stop(&mut self) {
        self.decoding = None;
    }

    fn is_live(&self) -> bool {
        self.decoding.is_some()
    }
}

/// Open demuxer plus decoder state for one pass over the file.
struct Decoding {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    flushing: bool,
}

impl Decoding {
    fn open(path: &Path) -> Result<Self, CaptureError> {
        ffmpeg_next::init().map_err(backend)?;
        let input = ffmpeg_next::format::input(path).map_err(backend)?;
        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::Backend(format!("no video stream in {}", path.display())))?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(backend)?;
        let decoder = codec_ctx.decoder().video().map_err(backend)?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(backend)?;

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            flushing: false,
        })
    }

    /// Next decoded frame as packed RGB24, or `None` at end of file.
    fn next_rgb(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        loop {
            if let Some(pixels) = self.try_receive()? {
                return Ok(Some(pixels));
            }
            if self.flushing {
                return Ok(None);
            }

            let Some((stream, packet)) = self.input.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                continue;
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if let Err(e) = self.decoder.send_packet(&packet) {
                log::debug!("Skipping undecodable packet: {e}");
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Vec<u8>>, CaptureError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb).map_err(backend)?;
        Ok(Some(packed_rgb(&rgb, self.width, self.height)))
    }
}

/// Strips per-row stride padding into a tightly packed RGB buffer.
fn packed_rgb(rgb: &ffmpeg_next::util::frame::video::Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}

fn backend(e: ffmpeg_next::Error) -> CaptureError {
    CaptureError::Backend(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes `num_frames` flat grey MPEG-4 frames.
    fn write_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        ffmpeg_next::init().unwrap();
        let fps = 10;
        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new()).unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let time_base = octx.stream(0).unwrap().time_base();

        let drain = |encoder: &mut ffmpeg_next::encoder::Video,
                         octx: &mut ffmpeg_next::format::context::Output| {
            let mut packet = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet.rescale_ts(ffmpeg_next::Rational(1, fps), time_base);
                packet.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..num_frames {
            let mut frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::YUV420P,
                width,
                height,
            );
            for plane in 0..3 {
                frame.data_mut(plane).fill(128);
            }
            frame.set_pts(Some(i as i64));
            encoder.send_frame(&frame).unwrap();
            drain(&mut encoder, &mut octx);
        }
        encoder.send_eof().unwrap();
        drain(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    #[test]
    fn test_replays_frames_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 3, 64, 48);

        let mut device = FfmpegFileDevice::new(&path, false);
        let mut stream = device.open(FacingMode::User).unwrap();

        for expected in 0..3 {
            let frame = stream.read_frame().unwrap();
            assert_eq!(frame.index(), expected);
            assert_eq!((frame.width(), frame.height(), frame.channels()), (64, 48, 3));
        }
        assert_eq!(stream.read_frame().unwrap_err(), CaptureError::Closed);
        assert!(!stream.is_live());
    }

    #[test]
    fn test_looping_restarts_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 2, 64, 48);

        let mut device = FfmpegFileDevice::new(&path, true);
        let mut stream = device.open(FacingMode::Environment).unwrap();
        let indices: Vec<usize> = (0..5).map(|_| stream.read_frame().unwrap().index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stop_closes_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        write_test_video(&path, 2, 64, 48);

        let mut stream = FfmpegFileDevice::new(&path, true)
            .open(FacingMode::User)
            .unwrap();
        stream.stop();
        assert_eq!(stream.read_frame().unwrap_err(), CaptureError::Closed);
    }

    #[test]
    fn test_missing_file_is_backend_error() {
        let mut device = FfmpegFileDevice::new("/nonexistent/clip.mp4", false);
        assert!(matches!(
            device.open(FacingMode::User).err(),
            Some(CaptureError::Backend(_))
        ));
    }
}
