//! Frame to NCHW tensor conversion for the ONNX adapters.

use ndarray::Array4;

use crate::shared::frame::Frame;

/// Nearest-neighbour resize to `size × size`, RGB scaled to `[0, 1]`, NCHW.
///
/// Only the first three channels are read, so RGBA frames work as-is.
pub fn rgb_nchw(frame: &Frame, size: u32) -> Array4<f32> {
    let src = frame.as_ndarray();
    let s = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = sample_index(y, s, frame.height() as usize);
        for x in 0..s {
            let src_x = sample_index(x, s, frame.width() as usize);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Nearest-neighbour resize to `size × size`, single luma channel in
/// `[0, 255]`, NCHW.
pub fn luma_nchw(frame: &Frame, size: u32) -> Array4<f32> {
    let src = frame.as_ndarray();
    let s = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 1, s, s));

    for y in 0..s {
        let src_y = sample_index(y, s, frame.height() as usize);
        for x in 0..s {
            let src_x = sample_index(x, s, frame.width() as usize);
            let r = src[[src_y, src_x, 0]] as f32;
            let g = src[[src_y, src_x, 1]] as f32;
            let b = src[[src_y, src_x, 2]] as f32;
            tensor[[0, 0, y, x]] = 0.299 * r + 0.587 * g + 0.114 * b;
        }
    }

    tensor
}

fn sample_index(dst: usize, dst_len: usize, src_len: usize) -> usize {
    (((dst as f64 + 0.5) * src_len as f64 / dst_len as f64) as usize).min(src_len.saturating_sub(1))
}
