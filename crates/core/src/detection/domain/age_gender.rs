use serde::Serialize;

use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw age/gender estimate for one face.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgeGenderPrediction {
    /// Continuous age estimate in years; may be slightly negative or fractional.
    pub age: f64,
    pub gender: Gender,
    pub gender_probability: f32,
}

pub trait AgeGenderNet: Send {
    fn predict(&mut self, face: &Frame) -> Result<AgeGenderPrediction, Box<dyn std::error::Error>>;
}

/// Rounds a continuous age estimate to whole years, never below zero.
pub fn round_age(age: f64) -> u32 {
    if !age.is_finite() || age <= 0.0 {
        return 0;
    }
    age.round().min(u32::MAX as f64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(29.6, 30)]
    #[case(29.4, 29)]
    #[case(29.5, 30)]
    #[case(0.4, 0)]
    #[case(-3.2, 0)]
    #[case(f64::NAN, 0)]
    fn test_round_age(#[case] raw: f64, #[case] expected: u32) {
        assert_eq!(round_age(raw), expected);
    }

    #[test]
    fn test_gender_labels() {
        assert_eq!(Gender::Male.to_string(), "male");
        assert_eq!(Gender::Female.to_string(), "female");
    }
}
