//! Vocabulary construction: counting, pruning, and id assignment.
//!
//! Ids are assigned to surviving tokens in sorted token order, never in
//! presentation order, so two corpora with the same token statistics produce
//! the same dictionary regardless of how their documents are arranged.

use crate::config::CoocConfig;
use crate::error::{CoocError, Result};
use crate::sequence::Document;
use crate::token::Token;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A frozen token -> column id bijection, with an optional mask id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDictionary {
    tokens: Vec<Token>,
    index: BTreeMap<Token, u32>,
    mask_id: Option<u32>,
}

impl TokenDictionary {
    /// Count the corpus and apply the configured pruning pipeline.
    pub fn build(docs: &[Document], config: &CoocConfig) -> Result<Self> {
        let mut occurrences: BTreeMap<Token, u64> = BTreeMap::new();
        let mut doc_counts: BTreeMap<Token, u64> = BTreeMap::new();
        let mut total: u64 = 0;
        for doc in docs {
            let mut seen: BTreeSet<Token> = BTreeSet::new();
            doc.for_each_token(|t| {
                *occurrences.entry(t.clone()).or_insert(0) += 1;
                total += 1;
                if !seen.contains(t) {
                    seen.insert(t.clone());
                }
            });
            for t in seen {
                *doc_counts.entry(t).or_insert(0) += 1;
            }
        }

        let total_f = total as f64;
        let n_docs_f = docs.len() as f64;
        let mut survivors: Vec<(Token, u64)> = occurrences
            .iter()
            .filter(|&(token, &count)| {
                let docs_with = doc_counts.get(token).copied().unwrap_or(0);
                let freq = if total > 0 { count as f64 / total_f } else { 0.0 };
                let doc_freq = if docs.is_empty() {
                    0.0
                } else {
                    docs_with as f64 / n_docs_f
                };
                config.min_occurrences.is_none_or(|m| count >= m)
                    && config.max_occurrences.is_none_or(|m| count <= m)
                    && config.min_frequency.is_none_or(|m| freq >= m)
                    && config.max_frequency.is_none_or(|m| freq <= m)
                    && config.min_document_occurrences.is_none_or(|m| docs_with >= m)
                    && config.max_document_occurrences.is_none_or(|m| docs_with <= m)
                    && config.min_document_frequency.is_none_or(|m| doc_freq >= m)
                    && config.max_document_frequency.is_none_or(|m| doc_freq <= m)
            })
            .map(|(token, &count)| (token.clone(), count))
            .collect();

        if let Some(cap) = config.max_unique_tokens {
            // Most frequent first, ties toward the smaller token.
            survivors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            survivors.truncate(cap);
        }
        if survivors.is_empty() {
            return Err(CoocError::EmptyVocabulary);
        }

        let mut tokens: Vec<Token> = survivors.into_iter().map(|(t, _)| t).collect();
        tokens.sort();
        Ok(Self::from_sorted_tokens(tokens, config.mask_token.clone()))
    }

    /// Use a caller-provided `token -> id` bijection over `[0, len)`.
    pub fn from_override(map: &BTreeMap<Token, u32>, mask: Option<Token>) -> Result<Self> {
        let mut tokens: Vec<Option<Token>> = vec![None; map.len()];
        for (token, &id) in map {
            let slot = tokens
                .get_mut(id as usize)
                .ok_or_else(|| CoocError::InvalidDictionary(format!("id {id} out of range")))?;
            if slot.is_some() {
                return Err(CoocError::InvalidDictionary(format!("duplicate id {id}")));
            }
            *slot = Some(token.clone());
        }
        let tokens: Vec<Token> = tokens.into_iter().flatten().collect();
        if tokens.len() != map.len() {
            return Err(CoocError::InvalidDictionary(
                "ids do not cover a contiguous range".to_string(),
            ));
        }
        if tokens.is_empty() {
            return Err(CoocError::EmptyVocabulary);
        }

        let index: BTreeMap<Token, u32> = map.clone();
        let mut dict = Self {
            tokens,
            index,
            mask_id: None,
        };
        dict.attach_mask(mask);
        Ok(dict)
    }

    fn from_sorted_tokens(tokens: Vec<Token>, mask: Option<Token>) -> Self {
        let index: BTreeMap<Token, u32> = tokens
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), u32::try_from(i).unwrap_or(u32::MAX)))
            .collect();
        let mut dict = Self {
            tokens,
            index,
            mask_id: None,
        };
        dict.attach_mask(mask);
        dict
    }

    /// Register the mask token, appending it when not already present.
    fn attach_mask(&mut self, mask: Option<Token>) {
        if let Some(mask) = mask {
            self.mask_id = Some(match self.index.get(&mask) {
                Some(&id) => id,
                None => {
                    let id = u32::try_from(self.tokens.len()).unwrap_or(u32::MAX);
                    self.tokens.push(mask.clone());
                    self.index.insert(mask, id);
                    id
                }
            });
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn id(&self, token: &Token) -> Option<u32> {
        self.index.get(token).copied()
    }

    #[must_use]
    pub fn token(&self, id: u32) -> &Token {
        &self.tokens[id as usize]
    }

    #[must_use]
    pub const fn mask_id(&self) -> Option<u32> {
        self.mask_id
    }

    /// The frozen token -> id map.
    #[must_use]
    pub const fn index(&self) -> &BTreeMap<Token, u32> {
        &self.index
    }

    /// Tokens in id order.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}
