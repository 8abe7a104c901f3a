/// Lightweight BlazeFace face detector running on ONNX Runtime via `ort`.
///
/// Produces scored boxes in frame coordinates; the analysis pipeline picks
/// the best one.
use std::path::Path;

use crate::detection::domain::face_detector::{Detection, FaceDetector};
use crate::shared::frame::Frame;
use crate::shared::region::Region;

use super::execution_provider::open_session;
use super::math::{nms, sigmoid, ScoredBox};
use super::tensor::rgb_nchw;

/// BlazeFace model input resolution.
const INPUT_SIZE: u32 = 128;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// Values per anchor in the regressor output: box (4) plus 6 keypoints.
const REGRESSOR_STRIDE: usize = 16;

pub struct OnnxBlazefaceDetector {
    session: ort::session::Session,
    confidence: f32,
    anchors: Vec<[f32; 2]>,
}

impl OnnxBlazefaceDetector {
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = open_session(model_path)?;
        Ok(Self {
            session,
            confidence: confidence as f32,
            anchors: generate_anchors(),
        })
    }
}

impl FaceDetector for OnnxBlazefaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(rgb_nchw(frame, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        // regressors: [1, 896, 16], classificators: [1, 896, 1]
        if outputs.len() < 2 {
            return Err(
                format!("BlazeFace model expected 2 outputs, got {}", outputs.len()).into(),
            );
        }
        let regressors = outputs[0].try_extract_array::<f32>()?;
        let scores = outputs[1].try_extract_array::<f32>()?;
        let reg_data = regressors.as_slice().ok_or("Cannot get regressor slice")?;
        let score_data = scores.as_slice().ok_or("Cannot get score slice")?;

        let candidates = decode(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence,
            (frame.width(), frame.height()),
        );

        Ok(nms(candidates, NMS_IOU_THRESH)
            .into_iter()
            .map(|b| Detection {
                region: Region::from_corners(b.bbox[0], b.bbox[1], b.bbox[2], b.bbox[3]),
                score: b.score,
            })
            .filter(|d| d.region.area() > 0)
            .collect())
    }
}

/// Decodes anchor-relative boxes above `confidence` into frame coordinates,
/// clamped to the frame.
fn decode(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f32,
    (fw, fh): (u32, u32),
) -> Vec<ScoredBox> {
    let size = INPUT_SIZE as f32;
    let mut out = Vec::new();

    for (i, &raw_score) in score_data.iter().enumerate().take(anchors.len()) {
        let score = sigmoid(raw_score);
        if score < confidence {
            continue;
        }
        let offset = i * REGRESSOR_STRIDE;
        let Some(reg) = reg_data.get(offset..offset + 4) else {
            break;
        };

        let anchor = anchors[i];
        let cx = anchor[0] + reg[0] / size;
        let cy = anchor[1] + reg[1] / size;
        let w = reg[2] / size;
        let h = reg[3] / size;

        out.push(ScoredBox {
            bbox: [
                ((cx - w / 2.0) * fw as f32).max(0.0) as f64,
                ((cy - h / 2.0) * fh as f32).max(0.0) as f64,
                ((cx + w / 2.0) * fw as f32).min(fw as f32) as f64,
                ((cy + h / 2.0) * fh as f32).min(fh as f32) as f64,
            ],
            score,
        });
    }

    out
}

/// Short-range anchors: a 16×16 grid with 2 anchors per cell, then 8×8 with 6.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)];
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}
