use std::sync::Arc;

use crate::Result;

/// One observation: a feature vector.
pub type Frame = Vec<f64>;

/// A trained sequence model that can assign a log-likelihood to observations.
///
/// `frames` holds every observation of the sequence; `lengths` partitions it into
/// consecutive segments and must sum to `frames.len()`.
///
/// Return [`Error::ScoreUndefined`](crate::Error::ScoreUndefined) when the likelihood is
/// mathematically undefined for this input. Any other error marks a structural defect.
pub trait Scorable {
    fn score(&self, frames: &[Frame], lengths: &[usize]) -> Result<f64>;
}

impl<T: Scorable + ?Sized> Scorable for &T {
    fn score(&self, frames: &[Frame], lengths: &[usize]) -> Result<f64> {
        (**self).score(frames, lengths)
    }
}

impl<T: Scorable + ?Sized> Scorable for Box<T> {
    fn score(&self, frames: &[Frame], lengths: &[usize]) -> Result<f64> {
        (**self).score(frames, lengths)
    }
}

impl<T: Scorable + ?Sized> Scorable for Arc<T> {
    fn score(&self, frames: &[Frame], lengths: &[usize]) -> Result<f64> {
        (**self).score(frames, lengths)
    }
}
