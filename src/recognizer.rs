//! Maximum-likelihood recognition of isolated sequences.
//!
//! Every test sequence is scored under every labelled model. A label whose model is missing,
//! or whose score is undefined for the sequence, scores `-inf`; any other scoring error aborts
//! the whole run. The guess for a sequence is the first label, in registry order, holding the
//! highest score.

use crate::{
    dataset::{TestCorpus, TestSequence},
    hmm::Scorable,
    registry::ModelRegistry,
    Result,
};

/// Log-likelihood per label for one test sequence, in registry order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreRecord {
    entries: Vec<(String, f64)>,
}

impl ScoreRecord {
    fn with_capacity(n: usize) -> Self {
        Self { entries: Vec::with_capacity(n) }
    }

    fn push(&mut self, label: &str, score: f64) {
        self.entries.push((label.to_string(), score));
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries.iter().find(|(l, _)| l == label).map(|&(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Output of [`recognize`]: all three vectors are indexed by test corpus order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recognition {
    pub test_ids: Vec<usize>,
    pub scores: Vec<ScoreRecord>,
    /// `None` when there were no labels to choose from.
    pub guesses: Vec<Option<String>>,
}

impl Recognition {
    fn with_capacity(n: usize) -> Self {
        Self {
            test_ids: Vec::with_capacity(n),
            scores: Vec::with_capacity(n),
            guesses: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, test_id: usize, record: ScoreRecord, guess: Option<String>) {
        self.test_ids.push(test_id);
        self.scores.push(record);
        self.guesses.push(guess);
    }

    pub fn len(&self) -> usize {
        self.test_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_ids.is_empty()
    }

    /// `(scores, guesses)`.
    pub fn into_parts(self) -> (Vec<ScoreRecord>, Vec<Option<String>>) {
        (self.scores, self.guesses)
    }
}

/// Scores one sequence under every model, tracking the best label as it goes: the first label
/// seeds it and only a strictly greater score replaces it.
fn score_sequence<M: Scorable>(
    models: &ModelRegistry<M>,
    test_id: usize,
    seq: &TestSequence,
) -> Result<(ScoreRecord, Option<String>)> {
    let mut record = ScoreRecord::with_capacity(models.len());
    let mut best: Option<(&str, f64)> = None;
    for (label, model) in models.iter() {
        let score = match model {
            None => f64::NEG_INFINITY,
            Some(model) => match model.score(seq.frames(), seq.lengths()) {
                Ok(score) if score.is_nan() => {
                    log::debug!("test {test_id}, label {label}: NaN score");
                    f64::NEG_INFINITY
                }
                Ok(score) => score,
                Err(e) if e.is_score_undefined() => {
                    log::debug!("test {test_id}, label {label}: {e}");
                    f64::NEG_INFINITY
                }
                Err(e) => {
                    log::error!("test {test_id}, label {label}: {e}");
                    return Err(e);
                }
            },
        };
        record.push(label, score);
        best = match best {
            Some((_, s)) if score <= s => best,
            _ => Some((label, score)),
        };
    }
    Ok((record, best.map(|(label, _)| label.to_string())))
}

/// Scores every sequence of `tests` under every model of `models` and picks the best label.
pub fn recognize<M: Scorable>(models: &ModelRegistry<M>, tests: &TestCorpus) -> Result<Recognition> {
    log::info!("recognize {} sequences against {} labels", tests.len(), models.len());
    let mut recognition = Recognition::with_capacity(tests.len());
    for (test_id, seq) in tests.iter() {
        let (record, guess) = score_sequence(models, test_id, seq)?;
        recognition.push(test_id, record, guess);
    }
    Ok(recognition)
}

/// Same as [`recognize`], scoring test sequences on the rayon thread pool.
#[cfg(feature = "parallel")]
pub fn recognize_par<M: Scorable + Sync>(models: &ModelRegistry<M>, tests: &TestCorpus) -> Result<Recognition> {
    use rayon::prelude::*;

    log::info!("recognize {} sequences against {} labels (parallel)", tests.len(), models.len());
    let items: Vec<(usize, &TestSequence)> = tests.iter().collect();
    let records = items
        .par_iter()
        .map(|&(test_id, seq)| score_sequence(models, test_id, seq).map(|(r, g)| (test_id, r, g)))
        .collect::<Result<Vec<_>>>()?;
    let mut recognition = Recognition::with_capacity(records.len());
    for (test_id, record, guess) in records {
        recognition.push(test_id, record, guess);
    }
    Ok(recognition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hmm::Frame;

    struct Fixed(f64);

    impl Scorable for Fixed {
        fn score(&self, _frames: &[Frame], _lengths: &[usize]) -> Result<f64> {
            Ok(self.0)
        }
    }

    fn guess(scores: &[(&str, Option<f64>)]) -> Option<String> {
        let mut models = ModelRegistry::new();
        for &(label, score) in scores {
            models.insert(label, score.map(Fixed)).unwrap();
        }
        let seq = TestSequence::new(vec![vec![0.0]]);
        let (record, guess) = score_sequence(&models, 0, &seq).unwrap();
        assert_eq!(record.len(), scores.len());
        guess
    }

    #[test]
    fn best_prefers_first_of_ties() {
        assert_eq!(guess(&[("A", Some(-15.0)), ("B", Some(-15.0)), ("C", Some(-20.0))]).as_deref(), Some("A"));
    }

    #[test]
    fn best_of_all_neg_infinity_is_first_label() {
        assert_eq!(guess(&[("A", None), ("B", Some(f64::NEG_INFINITY))]).as_deref(), Some("A"));
    }

    #[test]
    fn best_of_empty_registry_is_none() {
        assert_eq!(guess(&[]), None);
    }

    #[test]
    fn later_strictly_greater_score_wins() {
        assert_eq!(guess(&[("A", None), ("B", Some(-30.0)), ("C", Some(-30.0))]).as_deref(), Some("B"));
    }
}
