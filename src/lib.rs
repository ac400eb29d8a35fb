//! Maximum-likelihood recognizer for isolated observation sequences.
//!
//! Given one trained model per label and a corpus of unlabelled test sequences, [`recognize`]
//! scores each sequence under every model and guesses the label with the highest
//! log-likelihood.

mod error;
pub mod dataset;
pub mod hmm;
pub mod quark;
pub mod recognizer;
pub mod registry;

pub use dataset::{TestCorpus, TestSequence};
pub use error::{Error, Result};
pub use hmm::{Frame, GaussianHmm, Scorable};
pub use recognizer::{recognize, Recognition, ScoreRecord};
#[cfg(feature = "parallel")]
pub use recognizer::recognize_par;
pub use registry::ModelRegistry;
