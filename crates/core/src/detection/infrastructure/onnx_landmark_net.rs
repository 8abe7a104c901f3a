use std::path::Path;

use crate::detection::domain::face_landmarks::{LandmarkNet, LANDMARK_COUNT};
use crate::shared::frame::Frame;

use super::execution_provider::open_session;
use super::tensor::rgb_nchw;

const INPUT_SIZE: u32 = 112;

/// 68-point landmark regressor. Outputs 136 values, `(x, y)` pairs
/// normalized to the input crop.
pub struct OnnxLandmarkNet {
    session: ort::session::Session,
}

impl OnnxLandmarkNet {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
        })
    }
}

impl LandmarkNet for OnnxLandmarkNet {
    fn predict(&mut self, face: &Frame) -> Result<Vec<(f64, f64)>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(rgb_nchw(face, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let raw = outputs[0].try_extract_array::<f32>()?;
        let data = raw.as_slice().ok_or("Cannot get landmark slice")?;
        pairs(data)
    }
}

fn pairs(data: &[f32]) -> Result<Vec<(f64, f64)>, Box<dyn std::error::Error>> {
    if data.len() < LANDMARK_COUNT * 2 {
        return Err(format!(
            "landmark model returned {} values, expected {}",
            data.len(),
            LANDMARK_COUNT * 2
        )
        .into());
    }
    Ok(data[..LANDMARK_COUNT * 2]
        .chunks_exact(2)
        .map(|p| (p[0] as f64, p[1] as f64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_groups_coordinates() {
        let data: Vec<f32> = (0..LANDMARK_COUNT * 2).map(|i| i as f32).collect();
        let points = pairs(&data).unwrap();
        assert_eq!(points.len(), LANDMARK_COUNT);
        assert_eq!(points[1], (2.0, 3.0));
    }

    #[test]
    fn test_pairs_rejects_short_output() {
        assert!(pairs(&[0.0; 10]).is_err());
    }
}
