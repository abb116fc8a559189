//! Bag-of-ngrams document-term matrices.

use crate::error::{CoocError, Result};
use crate::sparse::CsrMatrix;
use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// What the fitted vocabulary contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NgramBehaviour {
    /// Only full-size ngrams.
    Exact,
    /// Full-size ngrams plus every shorter ngram. Counting still emits
    /// full-size ngrams, so the extra columns stay empty on the fit corpus.
    Subgrams,
}

/// A configured bag-of-ngrams vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgramVectorizer {
    pub ngram_size: usize,
    pub behaviour: NgramBehaviour,
    pub min_document_occurrences: Option<u64>,
    pub max_document_occurrences: Option<u64>,
    pub min_document_frequency: Option<f64>,
    pub max_document_frequency: Option<f64>,
}

impl Default for NgramVectorizer {
    fn default() -> Self {
        Self {
            ngram_size: 1,
            behaviour: NgramBehaviour::Exact,
            min_document_occurrences: None,
            max_document_occurrences: None,
            min_document_frequency: None,
            max_document_frequency: None,
        }
    }
}

impl NgramVectorizer {
    #[must_use]
    pub fn new(ngram_size: usize, behaviour: NgramBehaviour) -> Self {
        Self {
            ngram_size,
            behaviour,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn min_document_occurrences(mut self, min: u64) -> Self {
        self.min_document_occurrences = Some(min);
        self
    }

    #[must_use]
    pub const fn max_document_occurrences(mut self, max: u64) -> Self {
        self.max_document_occurrences = Some(max);
        self
    }

    #[must_use]
    pub const fn min_document_frequency(mut self, min: f64) -> Self {
        self.min_document_frequency = Some(min);
        self
    }

    #[must_use]
    pub const fn max_document_frequency(mut self, max: f64) -> Self {
        self.max_document_frequency = Some(max);
        self
    }

    /// Build the ngram vocabulary from the corpus.
    pub fn fit(&self, docs: &[Vec<Token>]) -> Result<FittedNgram> {
        if self.ngram_size == 0 {
            return Err(CoocError::InvalidConfig(
                "ngram_size must be at least 1".to_string(),
            ));
        }
        validate_token_kinds(docs)?;

        // Document counts per candidate ngram, including subgrams when asked.
        let sizes: Vec<usize> = match self.behaviour {
            NgramBehaviour::Exact => vec![self.ngram_size],
            NgramBehaviour::Subgrams => (1..=self.ngram_size).collect(),
        };
        let mut doc_counts: BTreeMap<Vec<Token>, u64> = BTreeMap::new();
        for doc in docs {
            let mut seen: BTreeSet<&[Token]> = BTreeSet::new();
            for &size in &sizes {
                for gram in doc.windows(size) {
                    seen.insert(gram);
                }
            }
            for gram in seen {
                *doc_counts.entry(gram.to_vec()).or_insert(0) += 1;
            }
        }

        let n_docs_f = docs.len() as f64;
        let vocabulary: BTreeMap<Vec<Token>, u32> = doc_counts
            .into_iter()
            .filter(|&(_, count)| {
                let freq = if docs.is_empty() {
                    0.0
                } else {
                    count as f64 / n_docs_f
                };
                self.min_document_occurrences.is_none_or(|m| count >= m)
                    && self.max_document_occurrences.is_none_or(|m| count <= m)
                    && self.min_document_frequency.is_none_or(|m| freq >= m)
                    && self.max_document_frequency.is_none_or(|m| freq <= m)
            })
            .enumerate()
            .map(|(id, (gram, _))| (gram, u32::try_from(id).unwrap_or(u32::MAX)))
            .collect();
        if vocabulary.is_empty() {
            return Err(CoocError::EmptyVocabulary);
        }
        debug!(
            vocabulary = vocabulary.len(),
            ngram_size = self.ngram_size,
            "fitted ngram vocabulary"
        );

        Ok(FittedNgram {
            ngram_size: self.ngram_size,
            vocabulary,
        })
    }

    /// Fit and count in one step.
    pub fn fit_transform(&self, docs: &[Vec<Token>]) -> Result<(FittedNgram, CsrMatrix)> {
        let model = self.fit(docs)?;
        let matrix = model.transform(docs)?;
        Ok((model, matrix))
    }
}

/// A frozen ngram vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedNgram {
    ngram_size: usize,
    vocabulary: BTreeMap<Vec<Token>, u32>,
}

impl FittedNgram {
    #[must_use]
    pub const fn vocabulary(&self) -> &BTreeMap<Vec<Token>, u32> {
        &self.vocabulary
    }

    /// Count full-size ngrams per document against the frozen vocabulary.
    /// Documents shorter than the ngram size produce empty rows.
    pub fn transform(&self, docs: &[Vec<Token>]) -> Result<CsrMatrix> {
        validate_token_kinds(docs)?;
        let mut triples = Vec::new();
        for (d, doc) in docs.iter().enumerate() {
            let row = u32::try_from(d).unwrap_or(u32::MAX);
            for gram in doc.windows(self.ngram_size) {
                if let Some(&id) = self.vocabulary.get(gram) {
                    triples.push((row, id, 1.0));
                }
            }
        }
        Ok(CsrMatrix::from_triples(
            docs.len(),
            self.vocabulary.len(),
            &triples,
        ))
    }
}

fn validate_token_kinds(docs: &[Vec<Token>]) -> Result<()> {
    let mut has_int = false;
    let mut has_text = false;
    for doc in docs {
        for t in doc {
            has_int |= t.is_int();
            has_text |= t.is_text();
            if has_int && has_text {
                return Err(CoocError::MixedTokenTypes);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_docs(docs: &[&[&str]]) -> Vec<Vec<Token>> {
        docs.iter()
            .map(|d| d.iter().map(|&s| Token::from(s)).collect())
            .collect()
    }

    fn permutation_corpus() -> Vec<Vec<Token>> {
        text_docs(&[&["wer", "pok"], &["bar", "pok"], &["foo", "pok", "wer"]])
    }

    #[test]
    fn test_unigram_counts() {
        let docs = text_docs(&[&["a", "b", "a"], &["b"]]);
        let (model, matrix) = NgramVectorizer::default().fit_transform(&docs).unwrap();
        assert_eq!(model.vocabulary().len(), 2);
        assert_eq!(matrix.to_dense(), vec![vec![2.0, 1.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_min_document_occurrences() {
        let v = NgramVectorizer::default().min_document_occurrences(2);
        let (_, matrix) = v.fit_transform(&permutation_corpus()).unwrap();
        assert_eq!((matrix.n_rows(), matrix.n_cols()), (3, 2));
        assert_eq!(
            matrix.to_dense(),
            vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]]
        );
    }

    #[test]
    fn test_min_document_frequency() {
        let v = NgramVectorizer::default().min_document_frequency(0.6);
        let (_, matrix) = v.fit_transform(&permutation_corpus()).unwrap();
        assert_eq!(
            matrix.to_dense(),
            vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]]
        );
    }

    #[test]
    fn test_max_document_occurrences() {
        let v = NgramVectorizer::default().max_document_occurrences(1);
        let (_, matrix) = v.fit_transform(&permutation_corpus()).unwrap();
        assert_eq!(
            matrix.to_dense(),
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]
        );
    }

    #[test]
    fn test_max_document_frequency() {
        let v = NgramVectorizer::default().max_document_frequency(0.4);
        let (_, matrix) = v.fit_transform(&permutation_corpus()).unwrap();
        assert_eq!(
            matrix.to_dense(),
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]
        );
    }

    fn larger_corpus() -> Vec<Vec<Token>> {
        text_docs(&[
            &["foo", "pok", "foo", "wer", "bar"],
            &[],
            &["bar", "foo", "bar", "pok", "wer", "foo", "bar", "foo", "pok", "bar", "wer"],
            &["wer", "foo", "foo", "pok", "bar", "wer", "bar"],
            &["foo", "bar", "bar", "foo", "bar", "foo", "pok", "wer", "pok", "bar", "wer"],
            &["pok", "wer", "bar", "foo", "pok", "foo", "wer", "wer", "foo", "pok", "bar"],
            &["bar", "foo", "pok", "foo", "wer", "wer", "foo", "wer", "foo", "pok", "bar", "wer"],
        ])
    }

    #[test]
    fn test_bigram_exact_and_subgram_shapes() {
        let docs = larger_corpus();
        let (exact, matrix) = NgramVectorizer::new(2, NgramBehaviour::Exact)
            .fit_transform(&docs)
            .unwrap();
        assert_eq!((matrix.n_rows(), matrix.n_cols()), (7, 15));
        assert_eq!(matrix.nnz(), 43);
        assert_eq!(exact.vocabulary().len(), 15);

        let (subgrams, matrix) = NgramVectorizer::new(2, NgramBehaviour::Subgrams)
            .fit_transform(&docs)
            .unwrap();
        // Four unigram columns join the vocabulary but collect no counts.
        assert_eq!((matrix.n_rows(), matrix.n_cols()), (7, 19));
        assert_eq!(matrix.nnz(), 43);
        assert_eq!(subgrams.vocabulary().len(), 19);

        // The empty document keeps an all-zero row.
        assert_eq!(matrix.row(1).0.len(), 0);
    }

    #[test]
    fn test_transform_matches_fit_transform() {
        let docs = permutation_corpus();
        let (model, matrix) = NgramVectorizer::default().fit_transform(&docs).unwrap();
        assert_eq!(model.transform(&docs).unwrap(), matrix);
    }

    #[test]
    fn test_short_document_gives_empty_row() {
        let docs = text_docs(&[&["a", "b"], &["c"]]);
        let (_, matrix) = NgramVectorizer::new(2, NgramBehaviour::Exact)
            .fit_transform(&docs)
            .unwrap();
        assert_eq!(matrix.row(1).0.len(), 0);
    }

    #[test]
    fn test_mixed_tokens_rejected() {
        let docs = vec![vec![Token::from(1), Token::from("a")]];
        assert_eq!(
            NgramVectorizer::default().fit(&docs).unwrap_err(),
            CoocError::MixedTokenTypes
        );
    }

    #[test]
    fn test_zero_ngram_size_rejected() {
        let v = NgramVectorizer::new(0, NgramBehaviour::Exact);
        assert!(matches!(
            v.fit(&permutation_corpus()),
            Err(CoocError::InvalidConfig(_))
        ));
    }
}
