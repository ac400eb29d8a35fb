use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::model::{Frame, Scorable};
use crate::{Error, Result};

const PROB_TOLERANCE: f64 = 1e-6;

/// `log(sum(exp(xs)))` without underflow. Empty or all `-inf` input gives `-inf`.
fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + xs.iter().map(|&x| (x - max).exp()).sum::<f64>().ln()
}

fn check_distribution(name: &str, probs: &[f64]) -> Result<()> {
    if probs.iter().any(|&p| !p.is_finite() || p < 0.0) {
        return Err(Error::ScoreUndefined(format!("{name} has a negative or non-finite probability")));
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > PROB_TOLERANCE {
        return Err(Error::ScoreUndefined(format!("{name} sums to {sum}, expected 1.0")));
    }
    Ok(())
}

/// Hidden Markov model with diagonal-covariance Gaussian emissions.
///
/// Matrices are stored row-major: `transmat[i * n + j]` is the probability of moving from
/// state `i` to state `j`, `means[i * d + k]` and `covars[i * d + k]` are the mean and variance
/// of feature `k` in state `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianHmm {
    n_components: usize,
    n_features: usize,
    startprob: Vec<f64>,
    transmat: Vec<f64>,
    means: Vec<f64>,
    covars: Vec<f64>,
}

impl GaussianHmm {
    /// Builds a model, rejecting inconsistent shapes and invalid parameters with
    /// [`Error::InvalidModel`].
    pub fn new(
        n_components: usize,
        n_features: usize,
        startprob: Vec<f64>,
        transmat: Vec<f64>,
        means: Vec<f64>,
        covars: Vec<f64>,
    ) -> Result<Self> {
        let model = Self { n_components, n_features, startprob, transmat, means, covars };
        model.check_shape()?;
        model.check_params().map_err(|e| match e {
            Error::ScoreUndefined(msg) => Error::InvalidModel(msg),
            e => e,
        })?;
        Ok(model)
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    fn check_shape(&self) -> Result<()> {
        let (n, d) = (self.n_components, self.n_features);
        if n == 0 || d == 0 {
            return Err(Error::InvalidModel(format!("n_components ({n}) and n_features ({d}) must be positive")));
        }
        let too_large = || Error::InvalidModel(format!("n_components ({n}) x n_features ({d}) is too large"));
        let nn = n.checked_mul(n).ok_or_else(too_large)?;
        let nd = n.checked_mul(d).ok_or_else(too_large)?;
        for (name, len, expected) in [
            ("startprob", self.startprob.len(), n),
            ("transmat", self.transmat.len(), nn),
            ("means", self.means.len(), nd),
            ("covars", self.covars.len(), nd),
        ] {
            if len != expected {
                return Err(Error::InvalidModel(format!("{name} has {len} values, expected {expected}")));
            }
        }
        Ok(())
    }

    /// Degenerate parameters leave the likelihood undefined rather than the model malformed.
    fn check_params(&self) -> Result<()> {
        check_distribution("startprob", &self.startprob)?;
        for (i, row) in self.transmat.chunks(self.n_components).enumerate() {
            check_distribution(&format!("transmat row {i}"), row)?;
        }
        if let Some(v) = self.covars.iter().find(|&&v| !v.is_finite() || v <= 0.0) {
            return Err(Error::ScoreUndefined(format!("covars must be positive and finite, got {v}")));
        }
        Ok(())
    }

    /// Frame widths and segment lengths must match the model and the buffer.
    fn check_layout(&self, frames: &[Frame], lengths: &[usize]) -> Result<()> {
        if let Some((t, frame)) = frames.iter().enumerate().find(|(_, f)| f.len() != self.n_features) {
            return Err(Error::InvalidSequence(format!(
                "frame {t} has {} features, model expects {}",
                frame.len(),
                self.n_features
            )));
        }
        let total = lengths
            .iter()
            .try_fold(0usize, |acc, &len| acc.checked_add(len))
            .ok_or_else(|| Error::InvalidSequence("lengths overflow".into()))?;
        if total != frames.len() {
            return Err(Error::InvalidSequence(format!(
                "lengths sum to {total} but the sequence has {} frames",
                frames.len()
            )));
        }
        Ok(())
    }

    fn check_observations(&self, frames: &[Frame], lengths: &[usize]) -> Result<()> {
        if frames.is_empty() || lengths.contains(&0) {
            return Err(Error::ScoreUndefined("empty sequence".into()));
        }
        if frames.iter().flatten().any(|x| !x.is_finite()) {
            return Err(Error::ScoreUndefined("sequence has non-finite values".into()));
        }
        Ok(())
    }

    /// Log density of `frame` under the emission distribution of `state`.
    fn log_emission(&self, state: usize, frame: &[f64]) -> f64 {
        let d = self.n_features;
        let means = &self.means[state * d..(state + 1) * d];
        let covars = &self.covars[state * d..(state + 1) * d];
        let sum: f64 = frame
            .iter()
            .zip(means)
            .zip(covars)
            .map(|((x, mu), var)| (2.0 * PI * var).ln() + (x - mu).powi(2) / var)
            .sum();
        -0.5 * sum
    }

    /// Forward algorithm in log space over one contiguous segment.
    fn forward(&self, frames: &[Frame]) -> f64 {
        let n = self.n_components;
        let log_trans: Vec<f64> = self.transmat.iter().map(|p| p.ln()).collect();
        let mut alpha: Vec<f64> = self
            .startprob
            .iter()
            .enumerate()
            .map(|(i, p)| p.ln() + self.log_emission(i, &frames[0]))
            .collect();
        let mut next = vec![0.0; n];
        let mut work = vec![0.0; n];
        for frame in &frames[1..] {
            for j in 0..n {
                for i in 0..n {
                    work[i] = alpha[i] + log_trans[i * n + j];
                }
                next[j] = log_sum_exp(&work) + self.log_emission(j, frame);
            }
            std::mem::swap(&mut alpha, &mut next);
        }
        log_sum_exp(&alpha)
    }
}

impl Scorable for GaussianHmm {
    fn score(&self, frames: &[Frame], lengths: &[usize]) -> Result<f64> {
        self.check_shape()?;
        self.check_layout(frames, lengths)?;
        self.check_params()?;
        self.check_observations(frames, lengths)?;
        let mut total = 0.0;
        let mut begin = 0;
        for &len in lengths {
            total += self.forward(&frames[begin..begin + len]);
            begin += len;
        }
        if total.is_nan() {
            return Err(Error::ScoreUndefined("log-likelihood is NaN".into()));
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state() -> GaussianHmm {
        GaussianHmm::new(
            2,
            1,
            vec![0.6, 0.4],
            vec![0.7, 0.3, 0.2, 0.8],
            vec![0.0, 3.0],
            vec![1.0, 2.0],
        )
        .unwrap()
    }

    fn gauss(x: f64, mu: f64, var: f64) -> f64 {
        (-(x - mu).powi(2) / (2.0 * var)).exp() / (2.0 * PI * var).sqrt()
    }

    #[test]
    fn single_state_closed_form() {
        let model = GaussianHmm::new(1, 1, vec![1.0], vec![1.0], vec![0.0], vec![1.0]).unwrap();
        let ll = model.score(&[vec![0.0], vec![1.0]], &[2]).unwrap();
        let expected = -(2.0 * PI).ln() - 0.5;
        assert!((ll - expected).abs() < 1e-12, "{ll} != {expected}");
    }

    #[test]
    fn forward_matches_path_enumeration() {
        let model = two_state();
        let xs = [0.5, 2.5, -1.0];
        let start = [0.6, 0.4];
        let trans = [[0.7, 0.3], [0.2, 0.8]];
        let emit = |s: usize, x: f64| if s == 0 { gauss(x, 0.0, 1.0) } else { gauss(x, 3.0, 2.0) };
        let mut total = 0.0;
        for path in 0..8usize {
            let s: Vec<usize> = (0..3).map(|t| (path >> t) & 1).collect();
            let mut p = start[s[0]] * emit(s[0], xs[0]);
            for t in 1..3 {
                p *= trans[s[t - 1]][s[t]] * emit(s[t], xs[t]);
            }
            total += p;
        }
        let frames: Vec<Frame> = xs.iter().map(|&x| vec![x]).collect();
        let ll = model.score(&frames, &[3]).unwrap();
        assert!((ll - total.ln()).abs() < 1e-9, "{ll} != {}", total.ln());
    }

    #[test]
    fn segments_are_scored_independently() {
        let model = two_state();
        let frames = vec![vec![0.1], vec![2.9], vec![1.4]];
        let joint = model.score(&frames, &[1, 2]).unwrap();
        let first = model.score(&frames[..1], &[1]).unwrap();
        let second = model.score(&frames[1..], &[2]).unwrap();
        assert!((joint - (first + second)).abs() < 1e-12);
    }

    #[test]
    fn degenerate_transitions_are_undefined() {
        let model: GaussianHmm = serde_json::from_value(serde_json::json!({
            "n_components": 2,
            "n_features": 1,
            "startprob": [0.5, 0.5],
            "transmat": [0.0, 0.0, 0.5, 0.5],
            "means": [0.0, 1.0],
            "covars": [1.0, 1.0]
        }))
        .unwrap();
        let err = model.score(&[vec![0.0]], &[1]).unwrap_err();
        assert!(err.is_score_undefined(), "{err}");
    }

    #[test]
    fn zero_variance_is_undefined() {
        let model: GaussianHmm = serde_json::from_value(serde_json::json!({
            "n_components": 1,
            "n_features": 1,
            "startprob": [1.0],
            "transmat": [1.0],
            "means": [0.0],
            "covars": [0.0]
        }))
        .unwrap();
        assert!(model.score(&[vec![0.0]], &[1]).unwrap_err().is_score_undefined());
    }

    #[test]
    fn empty_sequence_is_undefined() {
        let model = two_state();
        assert!(model.score(&[], &[]).unwrap_err().is_score_undefined());
        assert!(model.score(&[], &[0]).unwrap_err().is_score_undefined());
        assert!(model.score(&[vec![f64::NAN]], &[1]).unwrap_err().is_score_undefined());
    }

    #[test]
    fn malformed_sequence_is_rejected() {
        let model = two_state();
        match model.score(&[vec![0.0, 1.0]], &[1]) {
            Err(Error::InvalidSequence(..)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
        match model.score(&[vec![0.0], vec![1.0]], &[1]) {
            Err(Error::InvalidSequence(..)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn overflowing_lengths_are_rejected() {
        let model = two_state();
        match model.score(&[vec![0.0]], &[usize::MAX, 2]) {
            Err(Error::InvalidSequence(..)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn oversized_model_is_rejected() {
        let model: GaussianHmm = serde_json::from_value(serde_json::json!({
            "n_components": 4294967297u64,
            "n_features": 1,
            "startprob": [1.0],
            "transmat": [1.0],
            "means": [0.0],
            "covars": [1.0]
        }))
        .unwrap();
        match model.score(&[vec![0.0]], &[1]) {
            Err(Error::InvalidModel(..)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }

    #[test]
    fn degenerate_model_does_not_hide_malformed_sequence() {
        let model: GaussianHmm = serde_json::from_value(serde_json::json!({
            "n_components": 1,
            "n_features": 1,
            "startprob": [1.0],
            "transmat": [0.5],
            "means": [0.0],
            "covars": [1.0]
        }))
        .unwrap();
        match model.score(&[vec![0.0, 1.0, 2.0]], &[1]) {
            Err(Error::InvalidSequence(..)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
        assert!(model.score(&[vec![0.0]], &[1]).unwrap_err().is_score_undefined());
    }

    #[test]
    fn new_rejects_invalid_models() {
        match GaussianHmm::new(2, 1, vec![1.0], vec![1.0], vec![0.0], vec![1.0]) {
            Err(Error::InvalidModel(..)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
        match GaussianHmm::new(1, 1, vec![0.5], vec![1.0], vec![0.0], vec![1.0]) {
            Err(Error::InvalidModel(..)) => {}
            r => panic!("unexpected result: {r:?}"),
        }
    }
}
