use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{hmm::Frame, Error, Result};

/// One observation sequence to classify.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSequence {
    frames: Vec<Frame>,
    lengths: Vec<usize>,
}

impl TestSequence {
    /// A single segment spanning all of `frames`.
    pub fn new(frames: Vec<Frame>) -> Self {
        let lengths = vec![frames.len()];
        Self { frames, lengths }
    }

    /// Frames split into segments. The segment lengths are passed to the model untouched.
    pub fn with_lengths(frames: Vec<Frame>, lengths: Vec<usize>) -> Self {
        Self { frames, lengths }
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
        match self.lengths.last_mut() {
            Some(n) => *n += 1,
            None => self.lengths.push(1),
        }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn num_features(&self) -> Option<usize> {
        self.frames.first().map(Vec::len)
    }
}

/// Test sequences keyed by id, iterated in ascending id order.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestCorpus {
    v: BTreeMap<usize, TestSequence>,
}

impl TestCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sequence previously stored under `id`, if any.
    pub fn insert(&mut self, id: usize, seq: TestSequence) -> Option<TestSequence> {
        self.v.insert(id, seq)
    }

    pub fn get(&self, id: usize) -> Option<&TestSequence> {
        self.v.get(&id)
    }

    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &TestSequence)> {
        self.v.iter().map(|(&id, seq)| (id, seq))
    }

    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.v.keys().copied()
    }

    pub fn max_length(&self) -> usize {
        self.v.values().map(|x| x.len()).max().unwrap_or_default()
    }

    pub fn num_frames(&self) -> usize {
        self.v.values().map(|x| x.len()).sum()
    }

    /// Moves every sequence of `other` into this corpus, replacing existing ids.
    pub fn extend(&mut self, other: TestCorpus) {
        self.v.extend(other.v);
    }

    /// Reads one frame per line: `<test_id>\t<v1>\t<v2>...`.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut corpus = Self::default();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let Some((id, values)) = line.split_once('\t') else {
                log::warn!("invalid line: {line}");
                continue;
            };
            let id: usize = id
                .trim()
                .parse()
                .map_err(|e| Error::InvalidSequence(format!("line {}: bad test id {id:?}: {e}", n + 1)))?;
            let frame = values
                .split('\t')
                .map(|s| {
                    s.trim()
                        .parse::<f64>()
                        .map_err(|e| Error::InvalidSequence(format!("line {}: bad value {s:?}: {e}", n + 1)))
                })
                .collect::<Result<Frame>>()?;
            corpus.v.entry(id).or_default().push_frame(frame);
        }
        log::info!("read {} sequences ({} frames)", corpus.len(), corpus.num_frames());
        Ok(corpus)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path)?;
        Self::try_from(f)
    }
}

impl TryFrom<File> for TestCorpus {
    type Error = Error;

    fn try_from(value: File) -> Result<Self> {
        Self::from_reader(BufReader::new(value))
    }
}

impl FromIterator<(usize, TestSequence)> for TestCorpus {
    fn from_iter<I: IntoIterator<Item = (usize, TestSequence)>>(iter: I) -> Self {
        Self { v: iter.into_iter().collect() }
    }
}
