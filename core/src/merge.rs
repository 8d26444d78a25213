//! Document-at-a-time AND merges over postings lists.
//!
//! One entry point, [`daat_and`], parameterized by how lists are walked
//! ([`Traversal`]) and how matches are ordered ([`Scoring`]). Every variant
//! collects the same matched postings; the scoring policy only decides the
//! output order, so the four result sets agree by construction.

use crate::postings::{Cursor, DocId, Posting, PostingsList, SortKey};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Traversal {
    /// Min-heap over one forward pointer per term.
    Linear,
    /// Pairwise two-pointer intersection that follows skip links.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    /// Results in document-id order.
    Unscored,
    /// Results by descending tf-idf.
    TfIdf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeStrategy {
    pub traversal: Traversal,
    pub scoring: Scoring,
}

impl MergeStrategy {
    pub const DAAT_AND: Self = Self::new(false, false);
    pub const DAAT_AND_SKIP: Self = Self::new(true, false);
    pub const DAAT_AND_TF_IDF: Self = Self::new(false, true);
    pub const DAAT_AND_SKIP_TF_IDF: Self = Self::new(true, true);

    pub const fn new(use_skip: bool, use_tf_idf: bool) -> Self {
        Self {
            traversal: if use_skip { Traversal::Skip } else { Traversal::Linear },
            scoring: if use_tf_idf { Scoring::TfIdf } else { Scoring::Unscored },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub results: Vec<DocId>,
    pub num_comparisons: usize,
    pub num_docs: usize,
}

/// Intersect `lists` (each in document-id order) and count the comparisons
/// spent doing it.
///
/// Lists are merged shortest first. An empty list empties the result with no
/// comparisons; a single list is returned whole, also with no comparisons.
/// A matched document carries the highest tf-idf it has in any of the lists.
pub fn daat_and(lists: &[&PostingsList], strategy: MergeStrategy) -> MergeOutcome {
    debug_assert!(
        lists.iter().all(|l| l.order() == SortKey::DocId),
        "daat_and needs lists in document-id order"
    );
    if lists.is_empty() || lists.iter().any(|l| l.is_empty()) {
        return MergeOutcome::default();
    }
    let mut lists = lists.to_vec();
    lists.sort_by_key(|l| l.len());

    let (matched, num_comparisons) = match (lists.as_slice(), strategy.traversal) {
        ([only], _) => (only.traverse().copied().collect(), 0),
        (_, Traversal::Linear) => linear_merge(&lists),
        (_, Traversal::Skip) => skip_merge(&lists),
    };
    finish(matched, num_comparisons, strategy.scoring)
}

fn linear_merge(lists: &[&PostingsList]) -> (Vec<Posting>, usize) {
    let mut cursors: Vec<Cursor<'_>> = lists.iter().map(|l| l.head()).collect();
    // exactly one entry per term: the doc id under its cursor
    let mut heap: BinaryHeap<Reverse<(DocId, usize)>> = cursors
        .iter()
        .enumerate()
        .filter_map(|(term, c)| Some(Reverse((c.doc_id()?, term))))
        .collect();
    let mut matched = Vec::new();
    let mut comparisons = 0;

    while let Some(Reverse((doc_id, term))) = heap.pop() {
        comparisons += 1;
        if cursors.iter().all(|c| c.doc_id() == Some(doc_id)) {
            matched.push(combine(cursors.iter().filter_map(|c| c.posting())));
            while matches!(heap.peek(), Some(Reverse((d, _))) if *d == doc_id) {
                heap.pop();
            }
            for (t, cursor) in cursors.iter_mut().enumerate() {
                cursor.advance();
                match cursor.doc_id() {
                    Some(d) => heap.push(Reverse((d, t))),
                    None => return (matched, comparisons),
                }
            }
        } else {
            // the popped term is behind at least one other, so its doc can't match
            let cursor = &mut cursors[term];
            cursor.advance();
            match cursor.doc_id() {
                Some(d) => heap.push(Reverse((d, term))),
                None => break,
            }
        }
    }
    (matched, comparisons)
}

fn skip_merge(lists: &[&PostingsList]) -> (Vec<Posting>, usize) {
    let (mut matched, mut comparisons) = intersect_with_skips(lists[0].head(), lists[1].head());
    for list in &lists[2..] {
        if matched.is_empty() {
            break;
        }
        let mut partial: PostingsList = matched.into_iter().collect();
        partial.install_skip_connections();
        let (next, spent) = intersect_with_skips(partial.head(), list.head());
        matched = next;
        comparisons += spent;
    }
    (matched, comparisons)
}

fn intersect_with_skips(mut a: Cursor<'_>, mut b: Cursor<'_>) -> (Vec<Posting>, usize) {
    let mut matched = Vec::new();
    let mut comparisons = 0;
    while let (Some(pa), Some(pb)) = (a.posting(), b.posting()) {
        comparisons += 1;
        match pa.doc_id.cmp(&pb.doc_id) {
            Ordering::Equal => {
                matched.push(combine([pa, pb]));
                a.advance();
                b.advance();
            }
            Ordering::Less => a.skip_or_advance(pb.doc_id),
            Ordering::Greater => b.skip_or_advance(pa.doc_id),
        }
    }
    (matched, comparisons)
}

/// First posting of the group, carrying the group's best score.
fn combine<'a>(postings: impl IntoIterator<Item = &'a Posting>) -> Posting {
    let mut postings = postings.into_iter();
    let mut best = postings.next().copied().unwrap_or_else(|| Posting::new(0, 0, 0));
    for p in postings {
        if p.score() > best.score() {
            best.tf_idf = p.tf_idf;
        }
    }
    best
}

fn finish(mut matched: Vec<Posting>, num_comparisons: usize, scoring: Scoring) -> MergeOutcome {
    if scoring == Scoring::TfIdf {
        // stable, so equal scores stay in doc-id order
        matched.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap_or(Ordering::Equal));
    }
    let results: Vec<DocId> = matched.iter().map(|p| p.doc_id).collect();
    MergeOutcome { num_docs: results.len(), results, num_comparisons }
}
