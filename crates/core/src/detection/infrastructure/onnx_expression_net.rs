use std::path::Path;

use crate::detection::domain::expression::{Expression, ExpressionNet, ExpressionScores};
use crate::shared::frame::Frame;

use super::execution_provider::open_session;
use super::math::softmax;
use super::tensor::luma_nchw;

/// FER+ input: 64×64 grayscale.
const INPUT_SIZE: u32 = 64;

/// Emotion classifier emitting one logit per [`Expression`].
pub struct OnnxExpressionNet {
    session: ort::session::Session,
}

impl OnnxExpressionNet {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
        })
    }
}

impl ExpressionNet for OnnxExpressionNet {
    fn predict(&mut self, face: &Frame) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(luma_nchw(face, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let raw = outputs[0].try_extract_array::<f32>()?;
        let logits = raw.as_slice().ok_or("Cannot get expression slice")?;
        scores_from_logits(logits)
    }
}

fn scores_from_logits(logits: &[f32]) -> Result<ExpressionScores, Box<dyn std::error::Error>> {
    if logits.len() < Expression::ALL.len() {
        return Err(format!(
            "expression model returned {} logits, expected {}",
            logits.len(),
            Expression::ALL.len()
        )
        .into());
    }
    Ok(ExpressionScores::from_probabilities(&softmax(
        &logits[..Expression::ALL.len()],
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_logit_dominates() {
        let scores =
            scores_from_logits(&[0.1, 0.2, 0.3, 4.0, 0.0, -1.0, 0.0, 0.0]).unwrap();
        assert_eq!(scores.dominant(), Some(Expression::Sad));
        let total: f32 = scores.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_short_output_is_error() {
        assert!(scores_from_logits(&[1.0, 2.0]).is_err());
    }
}
