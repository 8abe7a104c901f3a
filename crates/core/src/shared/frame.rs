use ndarray::ArrayView3;

use crate::shared::region::Region;

/// A single camera/image frame: contiguous RGB or RGBA bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Fully transparent RGBA frame.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::new(
            vec![0u8; width as usize * height as usize * 4],
            width,
            height,
            4,
            0,
        )
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `region` into a new frame of exactly the
    /// region's size. Parts of the region outside the frame come out black.
    ///
    /// Returns `None` when the region does not overlap the frame.
    pub fn crop(&self, region: &Region) -> Option<Frame> {
        let visible = region.clamp_to(self.width, self.height)?;
        let channels = self.channels as usize;
        let out_width = region.width as usize;
        let out_height = region.height as usize;
        let row_len = self.width as usize * channels;
        let span = visible.width as usize * channels;

        let mut data = vec![0u8; out_width * out_height * channels];
        for row in visible.y..visible.y + visible.height {
            let src = row as usize * row_len + visible.x as usize * channels;
            let dst = ((row - region.y) as usize * out_width + (visible.x - region.x) as usize)
                * channels;
            data[dst..dst + span].copy_from_slice(&self.data[src..src + span]);
        }

        Some(Frame::new(
            data,
            out_width as u32,
            out_height as u32,
            self.channels,
            self.index,
        ))
    }

    /// Returns an RGBA copy; RGBA frames are cloned as-is.
    pub fn to_rgba(&self) -> Frame {
        if self.channels == 4 {
            return self.clone();
        }
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for px in self.data.chunks_exact(self.channels as usize) {
            data.extend_from_slice(&px[..3]);
            data.push(255);
        }
        Frame::new(data, self.width, self.height, 4, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                data.extend_from_slice(&[x as u8, y as u8, 7]);
            }
        }
        Frame::new(data, w, h, 3, 0)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, 3, 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_crop_copies_region_pixels() {
        let frame = gradient_frame(10, 8);
        let crop = frame.crop(&Region::new(2, 3, 4, 2)).unwrap();
        assert_eq!((crop.width(), crop.height()), (4, 2));
        let arr = crop.as_ndarray();
        assert_eq!(arr[[0, 0, 0]], 2); // x
        assert_eq!(arr[[0, 0, 1]], 3); // y
        assert_eq!(arr[[1, 3, 0]], 5);
        assert_eq!(arr[[1, 3, 1]], 4);
    }

    #[test]
    fn test_crop_past_edges_pads_with_black() {
        let frame = gradient_frame(10, 10);
        let crop = frame.crop(&Region::new(-5, 6, 8, 20)).unwrap();
        assert_eq!((crop.width(), crop.height()), (8, 20));
        let arr = crop.as_ndarray();
        // Column 5 is frame x = 0, row 0 is frame y = 6.
        assert_eq!(arr[[0, 5, 1]], 6);
        assert_eq!(arr[[3, 7, 0]], 2);
        assert_eq!(arr[[3, 7, 2]], 7);
        // Left of the frame and below it.
        assert_eq!(arr[[0, 4, 2]], 0);
        assert_eq!(arr[[4, 5, 2]], 0);
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = gradient_frame(10, 10);
        assert!(frame.crop(&Region::new(20, 20, 5, 5)).is_none());
    }

    #[test]
    fn test_to_rgba_adds_opaque_alpha() {
        let frame = gradient_frame(2, 1);
        let rgba = frame.to_rgba();
        assert_eq!(rgba.channels(), 4);
        assert_eq!(rgba.data(), &[0, 0, 7, 255, 1, 0, 7, 255]);
    }

    #[test]
    fn test_transparent_is_zeroed_rgba() {
        let frame = Frame::transparent(3, 2);
        assert_eq!(frame.channels(), 4);
        assert!(frame.data().iter().all(|&b| b == 0));
    }
}
