use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

static SAMPLE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/samples");

pub const BUILTIN_CORPUS: &str = "english";

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("sample corpus `{0}` not found")]
    NotFound(String),
    #[error("unable to read sample corpus: {0}")]
    Io(#[from] std::io::Error),
    #[error("unable to parse sample corpus: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("sample corpus `{0}` has no passages")]
    Empty(String),
}

/// Collection of passages offered for typing practice
#[derive(Deserialize, Clone, Debug)]
pub struct SampleCorpus {
    pub name: String,
    pub passages: Vec<String>,
}

impl SampleCorpus {
    pub fn builtin() -> Result<Self, CorpusError> {
        let file_name = format!("{BUILTIN_CORPUS}.json");
        let file = SAMPLE_DIR
            .get_file(&file_name)
            .ok_or_else(|| CorpusError::NotFound(file_name.clone()))?;
        let contents = file
            .contents_utf8()
            .ok_or_else(|| CorpusError::NotFound(file_name.clone()))?;

        Self::from_json(contents)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CorpusError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let mut corpus: SampleCorpus = serde_json::from_str(json)?;
        corpus.passages.retain(|p| !p.trim().is_empty());

        if corpus.passages.is_empty() {
            return Err(CorpusError::Empty(corpus.name));
        }
        Ok(corpus)
    }

    /// Single fixed passage, used when the user supplies their own prompt
    pub fn single(passage: String) -> Self {
        Self {
            name: "custom".to_string(),
            passages: vec![passage],
        }
    }

    /// One passage, uniformly at random
    pub fn pick_random_sample(&self) -> &str {
        self.passages
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default()
    }
}
