//! The co-occurrence vectorizer: dictionary fit, windowed accumulation,
//! multi-window composition, iterative refinement, and final pruning.

use crate::config::CoocConfig;
use crate::dictionary::TokenDictionary;
use crate::error::{CoocError, Result};
use crate::sequence::{
    directions, emit_contributions, resolve, validate_documents, Direction, Document, IdDocument,
};
use crate::sparse::{CooBuilder, CsrMatrix};
use crate::token::Token;
use crate::window::WindowSpec;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A configured but unfitted vectorizer.
#[derive(Debug, Clone, Default)]
pub struct CooccurrenceVectorizer {
    config: CoocConfig,
}

impl CooccurrenceVectorizer {
    #[must_use]
    pub fn new(config: CoocConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &CoocConfig {
        &self.config
    }

    /// Build the dictionary and the composed co-occurrence matrix.
    pub fn fit(&self, docs: &[Document]) -> Result<FittedCooccurrence> {
        let specs = self.config.build_specs()?;
        validate_documents(docs)?;

        let dictionary = match &self.config.token_dictionary {
            Some(map) => TokenDictionary::from_override(map, self.config.mask_token.clone())?,
            None => TokenDictionary::build(docs, &self.config)?,
        };
        debug!(
            vocabulary = dictionary.len(),
            windows = specs.len(),
            documents = docs.len(),
            "fitting co-occurrence model"
        );

        let matrix = compute_matrix(docs, &dictionary, &specs, &self.config)?;
        debug!(nnz = matrix.nnz(), columns = matrix.n_cols(), "fit complete");

        let column_labels = column_labels(&dictionary, &specs);
        Ok(FittedCooccurrence {
            config: self.config.clone(),
            specs,
            dictionary,
            column_labels,
            matrix,
        })
    }
}

/// An immutable fitted model: frozen dictionary plus the training matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedCooccurrence {
    config: CoocConfig,
    specs: Vec<WindowSpec>,
    dictionary: TokenDictionary,
    column_labels: Vec<String>,
    matrix: CsrMatrix,
}

impl FittedCooccurrence {
    /// The composed matrix from the fit corpus: rows are token ids, columns
    /// are `vocabulary x block` positions.
    #[must_use]
    pub const fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    #[must_use]
    pub const fn dictionary(&self) -> &TokenDictionary {
        &self.dictionary
    }

    /// Token -> row id map.
    #[must_use]
    pub const fn token_index(&self) -> &BTreeMap<Token, u32> {
        self.dictionary.index()
    }

    /// Column labels in column order: `pre_<w>_<token>` / `post_<w>_<token>`.
    #[must_use]
    pub fn column_labels(&self) -> &[String] {
        &self.column_labels
    }

    /// Id of a composed column by its label.
    #[must_use]
    pub fn column_id(&self, label: &str) -> Option<usize> {
        self.column_labels.iter().position(|l| l == label)
    }

    /// Recompute the co-occurrence matrix for new documents against the
    /// frozen dictionary. Out-of-vocabulary tokens are masked when a mask is
    /// configured and dropped otherwise.
    pub fn transform(&self, docs: &[Document]) -> Result<CsrMatrix> {
        validate_documents(docs)?;
        debug!(documents = docs.len(), "transforming with fitted model");
        compute_matrix(docs, &self.dictionary, &self.specs, &self.config)
    }
}

/// The `(spec index, direction)` column blocks in composition order.
fn block_layout(specs: &[WindowSpec]) -> Vec<(usize, Direction)> {
    specs
        .iter()
        .enumerate()
        .flat_map(|(w, spec)| {
            directions(spec.orientation)
                .iter()
                .map(move |&dir| (w, dir))
        })
        .collect()
}

fn column_labels(dictionary: &TokenDictionary, specs: &[WindowSpec]) -> Vec<String> {
    block_layout(specs)
        .into_iter()
        .flat_map(|(w, dir)| {
            let side = match dir {
                Direction::Before => "pre",
                Direction::After => "post",
            };
            dictionary
                .tokens()
                .iter()
                .map(move |t| format!("{side}_{w}_{t}"))
        })
        .collect()
}

fn compute_matrix(
    docs: &[Document],
    dictionary: &TokenDictionary,
    specs: &[WindowSpec],
    config: &CoocConfig,
) -> Result<CsrMatrix> {
    let resolved: Vec<IdDocument> = docs.iter().map(|d| resolve(d, dictionary)).collect();
    let layout = block_layout(specs);

    let pool = if config.n_threads > 1 {
        Some(
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.n_threads)
                .build()
                .map_err(|e| CoocError::ThreadPool(e.to_string()))?,
        )
    } else {
        None
    };

    let mut blocks = accumulate_blocks(
        &resolved,
        specs,
        &layout,
        dictionary.len(),
        config,
        pool.as_ref(),
        None,
    );
    nullify_mask(&mut blocks, dictionary, config);

    for pass in 0..config.n_iter {
        let priors: Vec<CsrMatrix> = blocks.iter().map(CsrMatrix::l1_normalize_rows).collect();
        blocks = accumulate_blocks(
            &resolved,
            specs,
            &layout,
            dictionary.len(),
            config,
            pool.as_ref(),
            Some(&priors),
        );
        nullify_mask(&mut blocks, dictionary, config);
        debug!(pass = pass + 1, "refinement pass complete");
    }

    let composed = CsrMatrix::hstack(&blocks);
    Ok(if config.epsilon > 0.0 {
        composed
            .l1_normalize_rows()
            .retain_greater(config.epsilon)
    } else {
        composed
    })
}

/// Accumulate one `CsrMatrix` per block, scanning documents in parallel but
/// folding their triple batches in document order so thread count never
/// changes the result.
fn accumulate_blocks(
    resolved: &[IdDocument],
    specs: &[WindowSpec],
    layout: &[(usize, Direction)],
    vocabulary: usize,
    config: &CoocConfig,
    pool: Option<&rayon::ThreadPool>,
    priors: Option<&[CsrMatrix]>,
) -> Vec<CsrMatrix> {
    layout
        .iter()
        .enumerate()
        .map(|(b, &(w, dir))| {
            let spec = &specs[w];
            let weights = spec.weights();
            let prior = priors.map(|p| &p[b]);
            let emit = |doc: &IdDocument| {
                let mut triples = Vec::new();
                emit_contributions(
                    doc,
                    spec,
                    &weights,
                    dir,
                    prior,
                    config.normalize_windows,
                    &mut triples,
                );
                triples
            };

            let batches: Vec<Vec<(u32, u32, f64)>> = match pool {
                Some(pool) => pool.install(|| resolved.par_iter().map(emit).collect()),
                None => resolved.iter().map(emit).collect(),
            };

            let budget = usize::try_from(config.coo_initial_memory.bytes()).unwrap_or(usize::MAX);
            let mut builder = CooBuilder::new(vocabulary, vocabulary, budget);
            for batch in &batches {
                builder.extend(batch);
            }
            if builder.flush_count() > 0 {
                debug!(block = b, flushes = builder.flush_count(), "triple buffer flushed");
            }
            builder.finish()
        })
        .collect()
}

fn nullify_mask(blocks: &mut [CsrMatrix], dictionary: &TokenDictionary, config: &CoocConfig) {
    if !config.nullify_mask {
        return;
    }
    if let Some(mask) = dictionary.mask_id() {
        for block in blocks.iter_mut() {
            *block = block.zero_row_col(mask);
        }
    }
}
