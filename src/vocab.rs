use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use crate::error::VocabError;
use crate::similarity::embedding::{Vector, Vocabulary};

/// In-memory word vectors read from the plain-text format
/// (`token v1 v2 ... vn` per line, with an optional `count dim` header line).
#[derive(Debug, Default)]
pub struct TextVectors {
    vectors: HashMap<String, Vector>,
    dim: usize,
}

impl TextVectors {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VocabError> {
        let path = path.as_ref();
        log::info!("Loading word vectors from {}", path.display());
        let vectors = Self::from_reader(File::open(path)?)?;
        log::info!("Loaded {} vectors (dim {})", vectors.len(), vectors.dim);
        Ok(vectors)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, VocabError> {
        let mut out = TextVectors::default();
        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let lineno = idx + 1;
            let mut parts = line.split_whitespace();
            let token = match parts.next() {
                Some(t) => t,
                None => continue,
            };
            let rest: Vec<&str> = parts.collect();
            if lineno == 1 && rest.len() == 1 && token.parse::<usize>().is_ok() && rest[0].parse::<usize>().is_ok() {
                continue; // "count dim" header
            }
            let values = rest
                .iter()
                .map(|c| c.parse::<f32>().map_err(|_| VocabError::Parse { line: lineno, component: c.to_string() }))
                .collect::<Result<Vec<f32>, _>>()?;
            if out.dim == 0 {
                out.dim = values.len();
            } else if values.len() != out.dim {
                return Err(VocabError::DimensionMismatch { line: lineno, expected: out.dim, actual: values.len() });
            }
            out.vectors.insert(token.to_string(), Arc::from(values));
        }
        if out.vectors.is_empty() || out.dim == 0 {
            return Err(VocabError::Empty);
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl Vocabulary for TextVectors {
    fn has_token(&self, token: &str) -> bool {
        self.vectors.contains_key(token)
    }

    fn vector(&self, token: &str) -> Option<Vector> {
        self.vectors.get(token).cloned()
    }
}
