//! cooc_engine - Windowed token co-occurrence vectorization
//!
//! Turns corpora of token sequences into sparse token x token co-occurrence
//! matrices: a frozen sorted-order vocabulary, one or more weighted windows
//! per anchor token, memory-bounded sparse accumulation, and optional
//! iterative refinement of the counts.
//!
//! Four document representations share one windowing contract and produce
//! identical matrices on equivalent inputs: plain sequences, timestamped
//! event streams, ordered multiset streams (hyperedges), and labelled trees.
//!
//! # Example
//!
//! ```
//! use cooc_engine::{CoocConfig, CooccurrenceVectorizer, Document, Orientation, Token};
//!
//! let docs = vec![
//!     Document::Plain(vec![Token::from("a"), Token::from("b"), Token::from("a")]),
//! ];
//! let config = CoocConfig::default()
//!     .window_radius(1)
//!     .window_orientation(Orientation::After)
//!     .normalize_windows(false);
//! let model = CooccurrenceVectorizer::new(config).fit(&docs)?;
//!
//! let a = model.dictionary().id(&Token::from("a")).unwrap();
//! let b = model.dictionary().id(&Token::from("b")).unwrap();
//! assert_eq!(model.matrix().get(a as usize, b), 1.0);
//! # Ok::<(), cooc_engine::CoocError>(())
//! ```

#![allow(clippy::cast_precision_loss)] // counts and offsets stay far below 2^52
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)] // error conditions are self-evident from Result types
#![allow(clippy::uninlined_format_args)] // keep format strings readable
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dictionary;
pub mod error;
pub mod ngram;
pub mod sequence;
pub mod sparse;
pub mod token;
pub mod vectorizer;
pub mod window;


pub use config::{CoocConfig, MemorySize};
pub use dictionary::TokenDictionary;
pub use error::{CoocError, Result};
pub use ngram::{FittedNgram, NgramBehaviour, NgramVectorizer};
pub use sequence::Document;
pub use sparse::{CooBuilder, CsrMatrix};
pub use token::Token;
pub use vectorizer::{CooccurrenceVectorizer, FittedCooccurrence};
pub use window::{
    Kernel, KernelParams, Orientation, WindowFunction, WindowParams, WindowSpec,
};
