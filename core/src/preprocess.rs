//! Turns corpus lines and raw query text into token sequences.

use crate::error::{Error, Result};
use crate::index::Document;
use crate::postings::DocId;
use crate::tokenizer::tokenize;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Raw query line, used as the result key.
    pub text: String,
    pub terms: Vec<String>,
}

impl Query {
    /// `None` for a blank line.
    pub fn parse(raw: &str) -> Option<Query> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        Some(Query { text: text.to_string(), terms: tokenize(text) })
    }

    /// Terms without repeats, in first-seen order.
    pub fn distinct_terms(&self) -> Vec<&str> {
        let mut seen = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            if !seen.contains(&term.as_str()) {
                seen.push(term.as_str());
            }
        }
        seen
    }
}

/// Split `"<doc_id>\t<text>"`. Whitespace around the id is ignored.
pub fn parse_corpus_line(line_no: usize, line: &str) -> Result<(DocId, &str)> {
    let (raw_id, text) = line
        .split_once('\t')
        .ok_or(Error::MissingSeparator { line: line_no })?;
    let doc_id = raw_id
        .trim()
        .parse::<DocId>()
        .map_err(|_| Error::InvalidDocId { line: line_no, raw: raw_id.trim().to_string() })?;
    Ok((doc_id, text.trim_end_matches('\r')))
}

/// Read and tokenize a corpus file. An unreadable file is an error; bad lines
/// (including ones that are not valid UTF-8) are logged and left out.
pub fn preprocess_corpus(path: &Path, workers: usize) -> Result<Vec<Document>> {
    let content = std::fs::read(path)
        .map_err(|source| Error::CorpusRead { path: path.to_path_buf(), source })?;
    let lines: Vec<&[u8]> = content.split(|&b| b == b'\n').collect();
    preprocess_raw_lines(&lines, workers)
}

/// Tokenize corpus lines on a pool of `workers` threads. Output keeps corpus order.
pub fn preprocess_lines(lines: &[&str], workers: usize) -> Result<Vec<Document>> {
    let lines: Vec<&[u8]> = lines.iter().map(|l| l.as_bytes()).collect();
    preprocess_raw_lines(&lines, workers)
}

fn preprocess_raw_lines(lines: &[&[u8]], workers: usize) -> Result<Vec<Document>> {
    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers.max(1)).build()?;
    let docs = pool.install(|| {
        lines
            .par_iter()
            .enumerate()
            .filter_map(|(i, raw)| match document_from_line(i + 1, raw) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping corpus line");
                    None
                }
            })
            .collect::<Vec<Document>>()
    });
    Ok(docs)
}

/// `Ok(None)` for a blank line.
fn document_from_line(line_no: usize, raw: &[u8]) -> Result<Option<Document>> {
    let line = std::str::from_utf8(raw).map_err(|_| Error::InvalidUtf8 { line: line_no })?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    let (id, text) = parse_corpus_line(line_no, line)?;
    Ok(Some(Document { id, tokens: tokenize(text) }))
}

/// One query per non-blank line.
pub fn preprocess_queries(text: &str) -> Vec<Query> {
    text.lines().filter_map(Query::parse).collect()
}
