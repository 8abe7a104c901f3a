pub mod ffmpeg_file_device;
pub mod nokhwa_camera;
