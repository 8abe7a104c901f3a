use serde::Serialize;

use crate::shared::frame::Frame;

/// Facial expression labels, in the emotion model's output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Neutral,
    Happy,
    Surprised,
    Sad,
    Angry,
    Disgusted,
    Fearful,
    Contempt,
}

impl Expression {
    pub const ALL: [Expression; 8] = [
        Expression::Neutral,
        Expression::Happy,
        Expression::Surprised,
        Expression::Sad,
        Expression::Angry,
        Expression::Disgusted,
        Expression::Fearful,
        Expression::Contempt,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Expression::Neutral => "neutral",
            Expression::Happy => "happy",
            Expression::Surprised => "surprised",
            Expression::Sad => "sad",
            Expression::Angry => "angry",
            Expression::Disgusted => "disgusted",
            Expression::Fearful => "fearful",
            Expression::Contempt => "contempt",
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Scores a face crop against every [`Expression`].
pub trait ExpressionNet: Send {
    fn predict(&mut self, face: &Frame) -> Result<ExpressionScores, Box<dyn std::error::Error>>;
}

/// Label/score pairs in a fixed iteration order.
///
/// The order matters: [`ExpressionScores::dominant`] resolves ties in
/// favour of the earliest entry.
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionScores {
    scores: Vec<(Expression, f32)>,
}

impl ExpressionScores {
    pub fn new(scores: Vec<(Expression, f32)>) -> Self {
        Self { scores }
    }

    /// Pairs probabilities with [`Expression::ALL`] by position.
    pub fn from_probabilities(probs: &[f32]) -> Self {
        Self::new(Expression::ALL.iter().copied().zip(probs.iter().copied()).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Expression, f32)> {
        self.scores.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn dominant(&self) -> Option<Expression> {
        dominant_label(&self.scores).copied()
    }
}

/// Label with the maximum score, found by a left-to-right fold with a
/// strict `>`: a later entry replaces the current best only when it
/// scores strictly higher, so the first entry wins every tie.
pub fn dominant_label<L>(scores: &[(L, f32)]) -> Option<&L> {
    let (first, rest) = scores.split_first()?;
    let best = rest
        .iter()
        .fold(first, |best, entry| if entry.1 > best.1 { entry } else { best });
    Some(&best.0)
}
