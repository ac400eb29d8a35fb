use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{quark::Quark, Error, Result};

/// Trained models keyed by label, traversed in insertion order.
///
/// A label may map to no model at all (training failed upstream); it still takes part in
/// recognition and always scores `-inf`.
#[derive(Debug, Clone)]
pub struct ModelRegistry<M> {
    labels: Quark,
    models: Vec<Option<M>>,
}

#[derive(Serialize, Deserialize)]
struct Entry<M> {
    label: String,
    model: Option<M>,
}

impl<M> Default for ModelRegistry<M> {
    fn default() -> Self {
        Self { labels: Quark::default(), models: Vec::new() }
    }
}

impl<M> ModelRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: &str, model: Option<M>) -> Result<()> {
        if self.labels.insert_new(label).is_none() {
            return Err(Error::DuplicateLabel(label.to_string()));
        }
        self.models.push(model);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter()
    }

    /// `None` if the label is unknown, `Some(None)` if it has no usable model.
    pub fn get(&self, label: &str) -> Option<Option<&M>> {
        self.labels.to_id(label).map(|i| self.models[i].as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&M>)> {
        self.labels.iter().zip(self.models.iter().map(Option::as_ref))
    }

    /// Number of labels that carry a usable model.
    pub fn num_models(&self) -> usize {
        self.models.iter().filter(|m| m.is_some()).count()
    }
}

impl<M> TryFrom<Vec<(String, Option<M>)>> for ModelRegistry<M> {
    type Error = Error;

    fn try_from(value: Vec<(String, Option<M>)>) -> Result<Self> {
        let mut registry = Self::default();
        for (label, model) in value {
            registry.insert(&label, model)?;
        }
        Ok(registry)
    }
}

impl<M: DeserializeOwned> ModelRegistry<M> {
    /// Reads a JSON array of `{"label": ..., "model": ... | null}` entries.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let entries: Vec<Entry<M>> = serde_json::from_reader(reader)?;
        let mut registry = Self::default();
        for entry in entries {
            if entry.model.is_none() {
                log::warn!("no model for label: {}", entry.label);
            }
            registry.insert(&entry.label, entry.model)?;
        }
        log::info!("loaded {} labels ({} with models)", registry.len(), registry.num_models());
        Ok(registry)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = File::open(path)?;
        Self::from_reader(BufReader::new(f))
    }
}

impl<M: Serialize> ModelRegistry<M> {
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let entries: Vec<Entry<&M>> = self
            .iter()
            .map(|(label, model)| Entry { label: label.to_string(), model })
            .collect();
        serde_json::to_writer(writer, &entries)?;
        Ok(())
    }
}
