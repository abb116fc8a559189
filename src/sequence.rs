//! Document representations and the adapters that turn each one into
//! weighted co-occurrence contributions.
//!
//! All four variants reduce to the same contract: for every anchor token and
//! window direction, produce the neighbors in that window together with their
//! 0-based offsets. Offsets feed the shared kernel weighting, so a timed
//! stream with unit spacing, a multiset stream of singletons, and a path tree
//! all reproduce the plain vectorizer entry for entry.

use crate::dictionary::TokenDictionary;
use crate::error::{CoocError, Result};
use crate::sparse::CsrMatrix;
use crate::token::Token;
use crate::window::{Orientation, WindowSpec, WindowWeights};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// One input document in any of the supported representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Document {
    /// An ordered token sequence.
    Plain(Vec<Token>),
    /// Tokens paired with non-decreasing timestamps.
    Timed(Vec<(Token, f64)>),
    /// An ordered sequence of token multisets (hyperedges).
    MultiSet(Vec<Vec<Token>>),
    /// A directed graph with labelled nodes.
    Tree {
        out_edges: Vec<Vec<usize>>,
        labels: Vec<Token>,
    },
}

impl Document {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Timed(_) => "timed",
            Self::MultiSet(_) => "multiset",
            Self::Tree { .. } => "tree",
        }
    }

    /// Visit every token occurrence in document order.
    pub fn for_each_token(&self, mut f: impl FnMut(&Token)) {
        match self {
            Self::Plain(tokens) => tokens.iter().for_each(&mut f),
            Self::Timed(events) => events.iter().for_each(|(t, _)| f(t)),
            Self::MultiSet(sets) => sets.iter().flatten().for_each(&mut f),
            Self::Tree { labels, .. } => labels.iter().for_each(&mut f),
        }
    }
}

/// Reject corpora that mix representations, mix token kinds, carry unsorted
/// timestamps, or reference nodes outside their tree.
pub(crate) fn validate_documents(docs: &[Document]) -> Result<()> {
    let mut kind: Option<&'static str> = None;
    let mut has_int = false;
    let mut has_text = false;

    for (doc_idx, doc) in docs.iter().enumerate() {
        match kind {
            None => kind = Some(doc.kind()),
            Some(expected) if expected != doc.kind() => {
                return Err(CoocError::MixedDocumentKinds {
                    expected,
                    got: doc.kind(),
                });
            }
            Some(_) => {}
        }

        doc.for_each_token(|t| {
            has_int |= t.is_int();
            has_text |= t.is_text();
        });
        if has_int && has_text {
            return Err(CoocError::MixedTokenTypes);
        }

        match doc {
            Document::Timed(events) => {
                if events.windows(2).any(|w| w[1].1 < w[0].1) {
                    return Err(CoocError::UnsortedTimestamps(doc_idx));
                }
            }
            Document::Tree { out_edges, labels } => {
                if out_edges.len() != labels.len() {
                    return Err(CoocError::EdgeOutOfRange {
                        doc: doc_idx,
                        index: out_edges.len(),
                        nodes: labels.len(),
                    });
                }
                for targets in out_edges {
                    for &t in targets {
                        if t >= labels.len() {
                            return Err(CoocError::EdgeOutOfRange {
                                doc: doc_idx,
                                index: t,
                                nodes: labels.len(),
                            });
                        }
                    }
                }
            }
            Document::Plain(_) | Document::MultiSet(_) => {}
        }
    }
    Ok(())
}

/// A document with tokens resolved to dictionary ids.
///
/// Out-of-vocabulary tokens are replaced by the mask id when one is
/// configured; otherwise they are spliced out (tree nodes are contracted so
/// each predecessor connects to each successor).
#[derive(Debug, Clone)]
pub(crate) enum IdDocument {
    Plain(Vec<u32>),
    Timed(Vec<(u32, f64)>),
    MultiSet(Vec<Vec<u32>>),
    Tree {
        out: Vec<Vec<usize>>,
        rev: Vec<Vec<usize>>,
        labels: Vec<u32>,
    },
}

pub(crate) fn resolve(doc: &Document, dict: &TokenDictionary) -> IdDocument {
    let lookup = |t: &Token| dict.id(t).or(dict.mask_id());
    match doc {
        Document::Plain(tokens) => {
            IdDocument::Plain(tokens.iter().filter_map(lookup).collect())
        }
        Document::Timed(events) => IdDocument::Timed(
            events
                .iter()
                .filter_map(|(t, time)| lookup(t).map(|id| (id, *time)))
                .collect(),
        ),
        Document::MultiSet(sets) => IdDocument::MultiSet(
            sets.iter()
                .map(|set| set.iter().filter_map(lookup).collect::<Vec<u32>>())
                .filter(|set| !set.is_empty())
                .collect(),
        ),
        Document::Tree { out_edges, labels } => resolve_tree(out_edges, labels, dict),
    }
}

/// Contract out-of-vocabulary nodes: every predecessor of a removed node
/// gains an edge to every successor, then the node disappears.
fn resolve_tree(out_edges: &[Vec<usize>], labels: &[Token], dict: &TokenDictionary) -> IdDocument {
    let mut ids: Vec<Option<u32>> = labels
        .iter()
        .map(|t| dict.id(t).or(dict.mask_id()))
        .collect();
    let mut succ: Vec<BTreeSet<usize>> = out_edges
        .iter()
        .map(|targets| targets.iter().copied().collect())
        .collect();
    let mut pred: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); labels.len()];
    for (u, targets) in succ.iter().enumerate() {
        for &v in targets {
            pred[v].insert(u);
        }
    }

    let mut removed = vec![false; labels.len()];
    for x in 0..labels.len() {
        if ids[x].is_some() {
            continue;
        }
        removed[x] = true;
        let preds: Vec<usize> = pred[x].iter().copied().collect();
        let succs: Vec<usize> = succ[x].iter().copied().collect();
        for &p in &preds {
            succ[p].remove(&x);
            for &s in &succs {
                if p != s {
                    succ[p].insert(s);
                    pred[s].insert(p);
                }
            }
        }
        for &s in &succs {
            pred[s].remove(&x);
        }
        succ[x].clear();
        pred[x].clear();
    }

    // Reindex surviving nodes.
    let mut remap = vec![usize::MAX; labels.len()];
    let mut kept_labels = Vec::new();
    for x in 0..labels.len() {
        if !removed[x] {
            remap[x] = kept_labels.len();
            kept_labels.push(ids[x].take().unwrap_or_default());
        }
    }
    let mut out = vec![Vec::new(); kept_labels.len()];
    let mut rev = vec![Vec::new(); kept_labels.len()];
    for x in 0..labels.len() {
        if removed[x] {
            continue;
        }
        for &s in &succ[x] {
            out[remap[x]].push(remap[s]);
            rev[remap[s]].push(remap[x]);
        }
    }

    IdDocument::Tree {
        out,
        rev,
        labels: kept_labels,
    }
}

/// One side of a window spec; `Orientation::Directional` expands to both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Before,
    After,
}

pub(crate) fn directions(orientation: Orientation) -> &'static [Direction] {
    match orientation {
        Orientation::Before => &[Direction::Before],
        Orientation::After => &[Direction::After],
        Orientation::Directional => &[Direction::Before, Direction::After],
    }
}

/// Emit the weighted `(anchor, neighbor, weight)` triples of one document for
/// one window direction.
///
/// `prior`, when present, multiplies every contribution by the row-normalized
/// block entry from the previous refinement pass; window placement
/// normalization happens after that multiplication.
pub(crate) fn emit_contributions(
    doc: &IdDocument,
    spec: &WindowSpec,
    weights: &WindowWeights,
    dir: Direction,
    prior: Option<&CsrMatrix>,
    normalize_windows: bool,
    out: &mut Vec<(u32, u32, f64)>,
) {
    let mut window: Vec<(u32, f64)> = Vec::new();
    match doc {
        IdDocument::Plain(ids) => {
            for (i, &anchor) in ids.iter().enumerate() {
                window.clear();
                match dir {
                    Direction::Before => {
                        for off in 0..spec.radius.min(i) {
                            window.push((ids[i - off - 1], weights.weight(off)));
                        }
                    }
                    Direction::After => {
                        for off in 0..spec.radius.min(ids.len() - i - 1) {
                            window.push((ids[i + off + 1], weights.weight(off)));
                        }
                    }
                }
                finalize_window(anchor, &mut window, prior, normalize_windows, out);
            }
        }
        IdDocument::Timed(events) => {
            let limit = spec.radius as f64;
            for (i, &(anchor, t)) in events.iter().enumerate() {
                window.clear();
                match dir {
                    Direction::Before => {
                        for (off, j) in (0..i).rev().enumerate() {
                            if t - events[j].1 > limit {
                                break;
                            }
                            window.push((events[j].0, weights.weight(off)));
                        }
                    }
                    Direction::After => {
                        for (off, j) in (i + 1..events.len()).enumerate() {
                            if events[j].1 - t > limit {
                                break;
                            }
                            window.push((events[j].0, weights.weight(off)));
                        }
                    }
                }
                finalize_window(anchor, &mut window, prior, normalize_windows, out);
            }
        }
        IdDocument::MultiSet(sets) => {
            for (s, set) in sets.iter().enumerate() {
                for (m, &anchor) in set.iter().enumerate() {
                    window.clear();
                    // Co-members share offset 0 with the adjacent set.
                    let w0 = weights.weight(0);
                    for (other, &n) in set.iter().enumerate() {
                        if other != m {
                            window.push((n, w0));
                        }
                    }
                    for d in 1..=spec.radius {
                        let neighbor_set = match dir {
                            Direction::Before => s.checked_sub(d).map(|j| &sets[j]),
                            Direction::After => sets.get(s + d),
                        };
                        let Some(neighbor_set) = neighbor_set else {
                            continue;
                        };
                        let w = weights.weight(d - 1);
                        for &n in neighbor_set {
                            window.push((n, w));
                        }
                    }
                    finalize_window(anchor, &mut window, prior, normalize_windows, out);
                }
            }
        }
        IdDocument::Tree { out: fwd, rev, labels } => {
            let adjacency = match dir {
                Direction::Before => rev,
                Direction::After => fwd,
            };
            for (u, &anchor) in labels.iter().enumerate() {
                window.clear();
                bfs_window(adjacency, u, spec.radius, weights, labels, &mut window);
                finalize_window(anchor, &mut window, prior, normalize_windows, out);
            }
        }
    }
}

/// Collect nodes within `radius` hops of `start`, weighted by minimal hop
/// distance minus one.
fn bfs_window(
    adjacency: &[Vec<usize>],
    start: usize,
    radius: usize,
    weights: &WindowWeights,
    labels: &[u32],
    window: &mut Vec<(u32, f64)>,
) {
    if radius == 0 {
        return;
    }
    let mut dist = vec![usize::MAX; adjacency.len()];
    dist[start] = 0;
    let mut queue = VecDeque::from([start]);
    while let Some(u) = queue.pop_front() {
        if dist[u] == radius {
            continue;
        }
        for &v in &adjacency[u] {
            if dist[v] == usize::MAX {
                dist[v] = dist[u] + 1;
                window.push((labels[v], weights.weight(dist[v] - 1)));
                queue.push_back(v);
            }
        }
    }
}

/// Apply the refinement prior and window normalization, then flush the
/// placement into the triple stream.
fn finalize_window(
    anchor: u32,
    window: &mut Vec<(u32, f64)>,
    prior: Option<&CsrMatrix>,
    normalize_windows: bool,
    out: &mut Vec<(u32, u32, f64)>,
) {
    if let Some(prior) = prior {
        for (n, w) in window.iter_mut() {
            *w *= prior.get(anchor as usize, *n);
        }
    }
    if normalize_windows {
        let total: f64 = window.iter().map(|&(_, w)| w).sum();
        if total > 0.0 {
            for (_, w) in window.iter_mut() {
                *w /= total;
            }
        }
    }
    for &(n, w) in window.iter() {
        if w != 0.0 {
            out.push((anchor, n, w));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoocConfig;
    use crate::window::{Kernel, KernelParams, WindowFunction, WindowParams};

    fn dict_for(docs: &[Document]) -> TokenDictionary {
        TokenDictionary::build(docs, &CoocConfig::default()).unwrap()
    }

    fn spec(radius: usize, orientation: Orientation) -> WindowSpec {
        WindowSpec {
            radius,
            orientation,
            window_function: WindowFunction::Fixed,
            kernel: Kernel::Flat,
            kernel_params: KernelParams::default(),
            window_params: WindowParams::default(),
        }
    }

    fn emit_plain(doc: &IdDocument, spec: &WindowSpec, dir: Direction) -> Vec<(u32, u32, f64)> {
        let mut out = Vec::new();
        emit_contributions(doc, spec, &spec.weights(), dir, None, false, &mut out);
        out
    }

    #[test]
    fn test_validate_rejects_mixed_kinds() {
        let docs = vec![
            Document::Plain(vec![Token::from(1)]),
            Document::Timed(vec![(Token::from(2), 0.0)]),
        ];
        assert!(matches!(
            validate_documents(&docs),
            Err(CoocError::MixedDocumentKinds { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_mixed_token_types() {
        let docs = vec![Document::Plain(vec![Token::from(1), Token::from("a")])];
        assert_eq!(validate_documents(&docs), Err(CoocError::MixedTokenTypes));
    }

    #[test]
    fn test_validate_rejects_unsorted_timestamps() {
        let docs = vec![Document::Timed(vec![
            (Token::from("a"), 1.0),
            (Token::from("b"), 0.5),
        ])];
        assert_eq!(validate_documents(&docs), Err(CoocError::UnsortedTimestamps(0)));
    }

    #[test]
    fn test_validate_rejects_bad_edges() {
        let docs = vec![Document::Tree {
            out_edges: vec![vec![5], vec![]],
            labels: vec![Token::from("a"), Token::from("b")],
        }];
        assert!(matches!(
            validate_documents(&docs),
            Err(CoocError::EdgeOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn test_plain_window_offsets() {
        let docs = vec![Document::Plain(
            ["a", "b", "c", "d"].map(Token::from).to_vec(),
        )];
        let dict = dict_for(&docs);
        let resolved = resolve(&docs[0], &dict);
        // Anchor c (id 2), before, radius 2: b at offset 0, a at offset 1.
        let triples = emit_plain(&resolved, &spec(2, Orientation::Before), Direction::Before);
        assert!(triples.contains(&(2, 1, 1.0)));
        assert!(triples.contains(&(2, 0, 1.0)));
        // 0 + 1 + 2 + 2 anchors' worth of neighbors.
        assert_eq!(triples.len(), 5);
    }

    #[test]
    fn test_timed_window_is_time_bounded() {
        let docs = vec![Document::Timed(vec![
            (Token::from("a"), 0.0),
            (Token::from("b"), 0.5),
            (Token::from("c"), 0.9),
            (Token::from("d"), 5.0),
        ])];
        let dict = dict_for(&docs);
        let resolved = resolve(&docs[0], &dict);
        // Radius 1 time unit: a sees b and c after it, never d.
        let triples = emit_plain(&resolved, &spec(1, Orientation::After), Direction::After);
        assert!(triples.contains(&(0, 1, 1.0)));
        assert!(triples.contains(&(0, 2, 1.0)));
        assert!(!triples.iter().any(|&(a, n, _)| a == 0 && n == 3));
    }

    #[test]
    fn test_multiset_own_set_excludes_self() {
        let docs = vec![Document::MultiSet(vec![vec![
            Token::from(1),
            Token::from(2),
            Token::from(3),
        ]])];
        let dict = dict_for(&docs);
        let resolved = resolve(&docs[0], &dict);
        let triples = emit_plain(&resolved, &spec(0, Orientation::Before), Direction::Before);
        // Ordered pairs over 3 co-members: 3 * 2.
        assert_eq!(triples.len(), 6);
        assert!(!triples.iter().any(|&(a, n, _)| a == n));
    }

    #[test]
    fn test_tree_contraction_splices_unknown_nodes() {
        // pok -> zzz -> wer with zzz out of vocabulary collapses to pok -> wer.
        let fit_docs = vec![Document::Plain(vec![Token::from("pok"), Token::from("wer")])];
        let dict = dict_for(&fit_docs);
        let tree = Document::Tree {
            out_edges: vec![vec![1], vec![2], vec![]],
            labels: vec![Token::from("pok"), Token::from("zzz"), Token::from("wer")],
        };
        let IdDocument::Tree { out, labels, .. } = resolve(&tree, &dict) else {
            panic!("expected tree");
        };
        assert_eq!(labels.len(), 2);
        let pok = dict.id(&Token::from("pok")).unwrap();
        let wer = dict.id(&Token::from("wer")).unwrap();
        assert_eq!(labels, vec![pok, wer]);
        assert_eq!(out, vec![vec![1], vec![]]);
    }

    #[test]
    fn test_mask_replaces_unknown_tokens() {
        let config = CoocConfig::default()
            .min_occurrences(2)
            .mask_token("[MASK]");
        let docs = vec![Document::Plain(
            ["a", "a", "b"].map(Token::from).to_vec(),
        )];
        let dict = TokenDictionary::build(&docs, &config).unwrap();
        let IdDocument::Plain(ids) = resolve(&docs[0], &dict) else {
            panic!("expected plain");
        };
        let mask = dict.mask_id().unwrap();
        assert_eq!(ids, vec![0, 0, mask]);
    }

    #[test]
    fn test_window_normalization_sums_to_one() {
        let docs = vec![Document::Plain(
            ["a", "b", "c", "d"].map(Token::from).to_vec(),
        )];
        let dict = dict_for(&docs);
        let resolved = resolve(&docs[0], &dict);
        let s = spec(3, Orientation::After);
        let mut out = Vec::new();
        emit_contributions(
            &resolved,
            &s,
            &s.weights(),
            Direction::After,
            None,
            true,
            &mut out,
        );
        let anchor0: f64 = out
            .iter()
            .filter(|&&(a, _, _)| a == 0)
            .map(|&(_, _, w)| w)
            .sum();
        assert!((anchor0 - 1.0).abs() < 1e-12);
    }
}
