//! Word index to term mapping read from a one-term-per-line file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NmfError, Result};

/// Word index → term lookup. Line `i` of the vocabulary file is word `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
}

impl Vocabulary {
    /// One term per line, trimmed. Blank lines keep their slot so indices stay aligned.
    pub fn parse(text: &str) -> Self {
        Self {
            terms: text.lines().map(|l| l.trim().to_string()).collect(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(Self::parse(&text))
    }

    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Stand-in vocabulary (`word_1`, `word_2`, ...) using the 1-based
    /// indices of the document format.
    pub fn numbered(n: usize) -> Self {
        Self {
            terms: (1..=n).map(|i| format!("word_{i}")).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Fail unless every one of `n_words` rows has a term.
    pub fn ensure_covers(&self, n_words: usize) -> Result<()> {
        if self.terms.len() < n_words {
            return Err(NmfError::Vocabulary {
                expected: n_words,
                actual: self.terms.len(),
            });
        }
        Ok(())
    }
}
