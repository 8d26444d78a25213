use crate::postings::{DocId, Posting, PostingsList};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub type TermId = u32;

/// A tokenized corpus entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub tokens: Vec<String>,
}

/// Term -> postings list. Term ids index `terms` and `postings`; after
/// [`InvertedIndex::sort_terms`] they follow lexicographic term order.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
    dictionary: HashMap<String, TermId>,
    terms: Vec<String>,
    postings: Vec<PostingsList>, // one per term, sorted by doc_id
    docs: HashSet<DocId>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Add every document of `corpus`, returning the number of documents indexed so far.
    pub fn index<I: IntoIterator<Item = Document>>(&mut self, corpus: I) -> u32 {
        for doc in corpus {
            self.add_document(&doc);
        }
        self.num_docs()
    }

    /// Insert one `(doc_id, term_frequency, document_length)` entry per distinct token.
    /// A document id seen before is skipped.
    pub fn add_document(&mut self, doc: &Document) -> bool {
        if !self.register_document(doc.id) {
            tracing::warn!(doc_id = doc.id, "duplicate document id, skipping");
            return false;
        }
        let doc_length = doc.tokens.len() as u32;
        let mut tf_counts: HashMap<&str, u32> = HashMap::new();
        for token in &doc.tokens {
            *tf_counts.entry(token.as_str()).or_insert(0) += 1;
        }
        for (term, tf) in tf_counts {
            self.insert_posting(term, Posting::new(doc.id, tf, doc_length));
        }
        true
    }

    /// Count a document towards the corpus size. False if it was already known.
    pub fn register_document(&mut self, doc_id: DocId) -> bool {
        self.docs.insert(doc_id)
    }

    pub fn insert_posting(&mut self, term: &str, posting: Posting) {
        let tid = match self.dictionary.get(term) {
            Some(&tid) => tid,
            None => {
                let tid = self.terms.len() as TermId;
                self.dictionary.insert(term.to_string(), tid);
                self.terms.push(term.to_string());
                self.postings.push(PostingsList::new());
                tid
            }
        };
        self.postings[tid as usize].insert_sorted(posting);
    }

    /// Renumber terms in lexicographic order. Lists are untouched.
    pub fn sort_terms(&mut self) {
        let mut entries: Vec<(String, PostingsList)> = std::mem::take(&mut self.terms)
            .into_iter()
            .zip(std::mem::take(&mut self.postings))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        self.dictionary = entries
            .iter()
            .enumerate()
            .map(|(tid, (term, _))| (term.clone(), tid as TermId))
            .collect();
        (self.terms, self.postings) = entries.into_iter().unzip();
    }

    pub fn add_skip_connections(&mut self) {
        for list in &mut self.postings {
            list.install_skip_connections();
        }
    }

    pub fn compute_tf_idf(&mut self, total_docs: u32, use_log: bool) {
        for list in &mut self.postings {
            list.compute_tf_idf(total_docs, use_log);
        }
    }

    /// `None` for a term that was never indexed.
    pub fn lookup(&self, term: &str) -> Option<&PostingsList> {
        let tid = *self.dictionary.get(term)?;
        self.postings.get(tid as usize)
    }

    /// Terms with their lists, in term-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostingsList)> {
        self.terms.iter().map(String::as_str).zip(self.postings.iter())
    }

    /// Indexed document ids, ascending.
    pub fn doc_ids(&self) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self.docs.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn num_docs(&self) -> u32 { self.docs.len() as u32 }

    pub fn num_terms(&self) -> usize { self.terms.len() }
}
