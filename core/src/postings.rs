//! Postings lists: per-term singly linked chains of document entries with
//! evenly spaced skip links.
//!
//! Nodes live in an arena owned by the list and are addressed by index. The
//! `next` link defines list order; `skip` is a cross-link into the same arena
//! that always points forward in that order. Any mutation drops the skip
//! links, so callers reinstall them once the list is final.

use serde::{Deserialize, Serialize};

pub type DocId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_frequency: u32,
    /// Total token count of the document.
    pub document_length: u32,
    pub tf_idf: Option<f64>,
}

impl Posting {
    pub fn new(doc_id: DocId, term_frequency: u32, document_length: u32) -> Self {
        Self { doc_id, term_frequency, document_length, tf_idf: None }
    }

    /// tf-idf score, zero until computed.
    pub fn score(&self) -> f64 {
        self.tf_idf.unwrap_or(0.0)
    }

    pub fn triple(&self) -> (DocId, u32, u32) {
        (self.doc_id, self.term_frequency, self.document_length)
    }
}

/// Ordering a list is kept in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Ascending document id.
    #[default]
    DocId,
    /// Descending tf-idf score.
    TfIdf,
}

impl SortKey {
    /// True when `a` must come strictly before `b`.
    fn precedes(self, a: &Posting, b: &Posting) -> bool {
        match self {
            SortKey::DocId => a.doc_id < b.doc_id,
            SortKey::TfIdf => a.score() > b.score(),
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    posting: Posting,
    next: Option<usize>,
    skip: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct PostingsList {
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
    order: SortKey,
    skip_interval: Option<usize>,
}

impl PostingsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ordered_by(order: SortKey) -> Self {
        Self { order, ..Self::default() }
    }

    pub fn order(&self) -> SortKey {
        self.order
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Distance between skip checkpoints, `None` when no skips are installed.
    pub fn skip_interval(&self) -> Option<usize> {
        self.skip_interval
    }

    pub fn skip_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.skip.is_some()).count()
    }

    /// Insert `posting` at the position that keeps the list ordered. Entries
    /// with an equal key stay ahead of the new one.
    pub fn insert_sorted(&mut self, posting: Posting) {
        self.clear_skips();
        let order = self.order;
        let idx = self.nodes.len();
        self.nodes.push(Node { posting, next: None, skip: None });

        let Some(head) = self.head else {
            self.head = Some(idx);
            self.tail = Some(idx);
            return;
        };
        if order.precedes(&posting, &self.nodes[head].posting) {
            self.nodes[idx].next = Some(head);
            self.head = Some(idx);
            return;
        }
        // Corpus order is usually already sorted, so try the tail first.
        if let Some(tail) = self.tail {
            if !order.precedes(&posting, &self.nodes[tail].posting) {
                self.nodes[tail].next = Some(idx);
                self.tail = Some(idx);
                return;
            }
        }

        let mut cur = head;
        while let Some(next) = self.nodes[cur].next {
            if order.precedes(&posting, &self.nodes[next].posting) {
                break;
            }
            cur = next;
        }
        self.nodes[idx].next = self.nodes[cur].next;
        self.nodes[cur].next = Some(idx);
        if self.nodes[idx].next.is_none() {
            self.tail = Some(idx);
        }
    }

    /// All entries in list order. The iterator is `Clone`, so a traversal can
    /// be restarted from any point.
    pub fn traverse(&self) -> Iter<'_> {
        Iter { list: self, at: self.head }
    }

    /// Walk that takes a skip link wherever one exists and the next link
    /// everywhere else.
    pub fn traverse_via_skips(&self) -> SkipIter<'_> {
        SkipIter { list: self, at: self.head }
    }

    /// Cursor on the first entry.
    pub fn head(&self) -> Cursor<'_> {
        Cursor { list: self, at: self.head }
    }

    pub fn doc_ids(&self) -> Vec<DocId> {
        self.traverse().map(|p| p.doc_id).collect()
    }

    pub fn skip_doc_ids(&self) -> Vec<DocId> {
        self.traverse_via_skips().map(|p| p.doc_id).collect()
    }

    /// `(doc_id, term_frequency, document_length)` per entry, in list order.
    pub fn triples(&self) -> Vec<(DocId, u32, u32)> {
        self.traverse().map(Posting::triple).collect()
    }

    /// Link every `round(sqrt(len))`-th node to the node that many positions
    /// ahead. Lists of two entries or fewer get no skips.
    pub fn install_skip_connections(&mut self) {
        self.clear_skips();
        let len = self.len();
        if len <= 2 {
            return;
        }
        let interval = (len as f64).sqrt().round() as usize;
        let chain = self.chain();
        for (pos, &idx) in chain.iter().enumerate().step_by(interval) {
            if let Some(&target) = chain.get(pos + interval) {
                self.nodes[idx].skip = Some(target);
            }
        }
        self.skip_interval = Some(interval);
    }

    /// Score every entry with `tf = term_frequency / document_length` and
    /// `idf = N / df` (or `ln(N / df)`), where `df` is this list's length.
    /// The chain is rebuilt with the scores and skips are reinstalled.
    pub fn compute_tf_idf(&mut self, total_document_count: u32, use_log: bool) {
        if self.is_empty() {
            return;
        }
        let ratio = f64::from(total_document_count) / self.len() as f64;
        let idf = if use_log { ratio.ln() } else { ratio };

        let mut rebuilt = PostingsList::ordered_by(self.order);
        for posting in self.traverse() {
            let tf = f64::from(posting.term_frequency) / f64::from(posting.document_length.max(1));
            rebuilt.insert_sorted(Posting { tf_idf: Some(tf * idf), ..*posting });
        }
        rebuilt.install_skip_connections();
        *self = rebuilt;
    }

    fn chain(&self) -> Vec<usize> {
        let mut chain = Vec::with_capacity(self.nodes.len());
        let mut at = self.head;
        while let Some(idx) = at {
            chain.push(idx);
            at = self.nodes[idx].next;
        }
        chain
    }

    fn clear_skips(&mut self) {
        if self.skip_interval.take().is_some() {
            for node in &mut self.nodes {
                node.skip = None;
            }
        }
    }
}

impl FromIterator<Posting> for PostingsList {
    fn from_iter<I: IntoIterator<Item = Posting>>(iter: I) -> Self {
        let mut list = PostingsList::new();
        for posting in iter {
            list.insert_sorted(posting);
        }
        list
    }
}

#[derive(Clone)]
pub struct Iter<'a> {
    list: &'a PostingsList,
    at: Option<usize>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Posting;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.at?];
        self.at = node.next;
        Some(&node.posting)
    }
}

#[derive(Clone)]
pub struct SkipIter<'a> {
    list: &'a PostingsList,
    at: Option<usize>,
}

impl<'a> Iterator for SkipIter<'a> {
    type Item = &'a Posting;

    fn next(&mut self) -> Option<Self::Item> {
        let node = &self.list.nodes[self.at?];
        self.at = node.skip.or(node.next);
        Some(&node.posting)
    }
}

/// Position inside a postings list, used by the merge routines.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    list: &'a PostingsList,
    at: Option<usize>,
}

impl<'a> Cursor<'a> {
    pub fn posting(&self) -> Option<&'a Posting> {
        self.at.map(|idx| &self.list.nodes[idx].posting)
    }

    pub fn doc_id(&self) -> Option<DocId> {
        self.posting().map(|p| p.doc_id)
    }

    pub fn is_exhausted(&self) -> bool {
        self.at.is_none()
    }

    pub fn advance(&mut self) {
        if let Some(idx) = self.at {
            self.at = self.list.nodes[idx].next;
        }
    }

    /// Cursor on this node's skip target, if it has one.
    pub fn skip_target(&self) -> Option<Cursor<'a>> {
        let target = self.list.nodes[self.at?].skip?;
        Some(Cursor { list: self.list, at: Some(target) })
    }

    /// Move towards `target`: jump along the skip link when it does not
    /// overshoot, otherwise step one node.
    pub fn skip_or_advance(&mut self, target: DocId) {
        match self.skip_target() {
            Some(skip) if skip.doc_id().is_some_and(|d| d <= target) => *self = skip,
            _ => self.advance(),
        }
    }
}
