//! Builds the frozen index and runs query batches against it.

use crate::error::Result;
use crate::index::{Document, InvertedIndex};
use crate::merge::{daat_and, MergeOutcome, MergeStrategy};
use crate::postings::{DocId, PostingsList};
use crate::preprocess::{preprocess_corpus, Query};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Threads used to tokenize the corpus.
    pub workers: usize,
    /// Use `ln(N / df)` instead of `N / df` as idf.
    pub log_idf: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { workers: 4, log_idf: false }
    }
}

/// Everything a batch of queries produced, keyed by term or raw query text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResponse {
    pub postings_list: BTreeMap<String, Vec<DocId>>,
    pub postings_list_skip: BTreeMap<String, Vec<DocId>>,
    pub daat_and: BTreeMap<String, MergeOutcome>,
    pub daat_and_skip: BTreeMap<String, MergeOutcome>,
    pub daat_and_tf_idf: BTreeMap<String, MergeOutcome>,
    pub daat_and_skip_tf_idf: BTreeMap<String, MergeOutcome>,
}

/// Result of one query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// `(term, doc ids)` per distinct term, full list.
    pub postings: Vec<(String, Vec<DocId>)>,
    /// `(term, doc ids)` per distinct term, walked along skip links.
    pub skip_postings: Vec<(String, Vec<DocId>)>,
    pub daat_and: MergeOutcome,
    pub daat_and_skip: MergeOutcome,
    pub daat_and_tf_idf: MergeOutcome,
    pub daat_and_skip_tf_idf: MergeOutcome,
}

impl RetrievalResponse {
    fn absorb(&mut self, key: &str, result: QueryResult) {
        self.postings_list.extend(result.postings);
        self.postings_list_skip.extend(result.skip_postings);
        self.daat_and.insert(key.to_string(), result.daat_and);
        self.daat_and_skip.insert(key.to_string(), result.daat_and_skip);
        self.daat_and_tf_idf.insert(key.to_string(), result.daat_and_tf_idf);
        self.daat_and_skip_tf_idf.insert(key.to_string(), result.daat_and_skip_tf_idf);
    }
}

/// A sorted, skip-linked, tf-idf scored index. Read-only once built, so it
/// can be shared across threads.
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    index: InvertedIndex,
    log_idf: bool,
}

impl RetrievalEngine {
    /// Tokenize and index a corpus file.
    pub fn index_corpus(path: impl AsRef<Path>, options: IndexOptions) -> Result<Self> {
        let docs = preprocess_corpus(path.as_ref(), options.workers)?;
        Ok(Self::from_documents(docs, options))
    }

    pub fn from_documents(docs: impl IntoIterator<Item = Document>, options: IndexOptions) -> Self {
        let mut index = InvertedIndex::new();
        index.index(docs);
        Self::from_index(index, options.log_idf)
    }

    /// Freeze a populated index. Terms are sorted before skips and scores are
    /// installed so both see the final list lengths.
    pub fn from_index(mut index: InvertedIndex, log_idf: bool) -> Self {
        index.sort_terms();
        index.add_skip_connections();
        index.compute_tf_idf(index.num_docs(), log_idf);
        tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "index ready");
        Self { index, log_idf }
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn log_idf(&self) -> bool {
        self.log_idf
    }

    /// Doc ids for `term`, empty when the term is unknown.
    pub fn postings(&self, term: &str) -> Vec<DocId> {
        self.index.lookup(term).map(PostingsList::doc_ids).unwrap_or_default()
    }

    pub fn skip_postings(&self, term: &str) -> Vec<DocId> {
        self.index.lookup(term).map(PostingsList::skip_doc_ids).unwrap_or_default()
    }

    pub fn run_query(&self, query: &Query) -> QueryResult {
        let terms = query.distinct_terms();
        let empty = PostingsList::new();
        let lists: Vec<&PostingsList> =
            terms.iter().map(|t| self.index.lookup(t).unwrap_or(&empty)).collect();

        let result = QueryResult {
            postings: terms.iter().map(|t| (t.to_string(), self.postings(t))).collect(),
            skip_postings: terms.iter().map(|t| (t.to_string(), self.skip_postings(t))).collect(),
            daat_and: daat_and(&lists, MergeStrategy::DAAT_AND),
            daat_and_skip: daat_and(&lists, MergeStrategy::DAAT_AND_SKIP),
            daat_and_tf_idf: daat_and(&lists, MergeStrategy::DAAT_AND_TF_IDF),
            daat_and_skip_tf_idf: daat_and(&lists, MergeStrategy::DAAT_AND_SKIP_TF_IDF),
        };
        tracing::debug!(
            query = %query.text,
            num_docs = result.daat_and.num_docs,
            comparisons = result.daat_and.num_comparisons,
            skip_comparisons = result.daat_and_skip.num_comparisons,
            "query merged"
        );
        result
    }

    /// Run a batch concurrently. Queries without any usable term are skipped.
    pub fn run_queries(&self, queries: &[Query]) -> RetrievalResponse {
        let results: Vec<(&Query, QueryResult)> = queries
            .par_iter()
            .filter_map(|query| {
                if query.terms.is_empty() {
                    tracing::warn!(query = %query.text, "query has no searchable terms, skipping");
                    return None;
                }
                Some((query, self.run_query(query)))
            })
            .collect();

        let mut response = RetrievalResponse::default();
        for (query, result) in results {
            response.absorb(&query.text, result);
        }
        tracing::info!(num_queries = response.daat_and.len(), "query batch finished");
        response
    }
}
