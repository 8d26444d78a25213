use crate::index::InvertedIndex;
use crate::postings::{DocId, Posting};
use crate::retrieval::{RetrievalEngine, RetrievalResponse};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub log_idf: bool,
    pub created_at: String,
    pub version: u32,
}

/// Raw postings, before skips and scores.
#[derive(Debug, Serialize, Deserialize)]
struct PostingsFile {
    doc_ids: Vec<DocId>,
    terms: Vec<(String, Vec<(DocId, u32, u32)>)>,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write every list as `(doc_id, term_frequency, document_length)` triples plus a meta file.
pub fn save_snapshot(paths: &IndexPaths, engine: &RetrievalEngine) -> Result<MetaFile> {
    let index = engine.index();
    let file = PostingsFile {
        doc_ids: index.doc_ids(),
        terms: index.iter().map(|(term, list)| (term.to_string(), list.triples())).collect(),
    };
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.postings())?;
    let bytes = bincode::serialize(&file)?;
    f.write_all(&bytes)?;

    let meta = MetaFile {
        num_docs: index.num_docs(),
        num_terms: index.num_terms(),
        log_idf: engine.log_idf(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: SNAPSHOT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_terms = meta.num_terms, "snapshot written");
    Ok(meta)
}

/// Rebuild an engine from a snapshot. Lists are re-created entry by entry
/// with sorted insertion, then frozen exactly like a fresh build.
pub fn load_snapshot(paths: &IndexPaths) -> Result<RetrievalEngine> {
    let meta = load_meta(paths)?;
    if meta.version > SNAPSHOT_VERSION {
        bail!("snapshot version {} is newer than supported version {}", meta.version, SNAPSHOT_VERSION);
    }
    let mut f = File::open(paths.postings())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let file: PostingsFile = bincode::deserialize(&buf)?;

    let mut index = InvertedIndex::new();
    for doc_id in file.doc_ids {
        index.register_document(doc_id);
    }
    for (term, triples) in file.terms {
        for (doc_id, tf, doc_length) in triples {
            index.insert_posting(&term, Posting::new(doc_id, tf, doc_length));
        }
    }
    if index.num_docs() != meta.num_docs {
        tracing::warn!(expected = meta.num_docs, found = index.num_docs(), "snapshot document count mismatch");
    }
    tracing::info!(root = %paths.root.display(), "snapshot loaded");
    Ok(RetrievalEngine::from_index(index, meta.log_idf))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Write a batch response as pretty JSON.
pub fn save_response(path: &Path, response: &RetrievalResponse) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut f = File::create(path)?;
    let json = serde_json::to_string_pretty(response)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_response(path: &Path) -> Result<RetrievalResponse> {
    let f = File::open(path)?;
    Ok(serde_json::from_reader(f)?)
}
