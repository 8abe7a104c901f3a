use std::path::Path;

use crate::detection::domain::age_gender::{AgeGenderNet, AgeGenderPrediction, Gender};
use crate::shared::frame::Frame;

use super::execution_provider::open_session;
use super::math::softmax;
use super::tensor::rgb_nchw;

const INPUT_SIZE: u32 = 96;

/// Age/gender regressor with output `[female_logit, male_logit, age / 100]`.
pub struct OnnxAgeGenderNet {
    session: ort::session::Session,
}

impl OnnxAgeGenderNet {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            session: open_session(model_path)?,
        })
    }
}

impl AgeGenderNet for OnnxAgeGenderNet {
    fn predict(&mut self, face: &Frame) -> Result<AgeGenderPrediction, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(rgb_nchw(face, INPUT_SIZE))?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let raw = outputs[0].try_extract_array::<f32>()?;
        let data = raw.as_slice().ok_or("Cannot get age/gender slice")?;
        decode(data)
    }
}

fn decode(data: &[f32]) -> Result<AgeGenderPrediction, Box<dyn std::error::Error>> {
    let [female, male, age, ..] = data else {
        return Err(format!("age/gender model returned {} values, expected 3", data.len()).into());
    };
    let probs = softmax(&[*female, *male]);
    let (gender, gender_probability) = if probs[1] >= probs[0] {
        (Gender::Male, probs[1])
    } else {
        (Gender::Female, probs[0])
    };
    Ok(AgeGenderPrediction {
        age: *age as f64 * 100.0,
        gender,
        gender_probability,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_decode_female() {
        let p = decode(&[3.0, -1.0, 0.274]).unwrap();
        assert_eq!(p.gender, Gender::Female);
        assert!(p.gender_probability > 0.9);
        assert_relative_eq!(p.age, 27.4, epsilon = 1e-4);
    }

    #[test]
    fn test_decode_male() {
        let p = decode(&[-2.0, 2.0, 0.5]).unwrap();
        assert_eq!(p.gender, Gender::Male);
    }

    #[test]
    fn test_decode_short_output_is_error() {
        assert!(decode(&[0.1, 0.2]).is_err());
    }
}
