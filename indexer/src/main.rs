use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use daat_core::persist::{save_response, save_snapshot, IndexPaths};
use daat_core::preprocess::preprocess_queries;
use daat_core::{IndexOptions, RetrievalEngine};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputCollection {
    documents: Vec<InputDoc>,
}

#[derive(Debug, Deserialize)]
struct InputDoc {
    summary: String,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a Boolean inverted index and run DAaT AND queries against it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a corpus, run a query file and write the results as JSON
    Run {
        /// Corpus file, one `<doc_id>\t<text>` per line
        #[arg(long)]
        corpus: PathBuf,
        /// Query file, one query per line
        #[arg(long)]
        queries: PathBuf,
        /// Output JSON path
        #[arg(long, default_value = "output.json")]
        output: PathBuf,
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Index a corpus and write a snapshot directory
    Build {
        #[arg(long)]
        corpus: PathBuf,
        /// Output index directory
        #[arg(long, default_value = "./index")]
        output: PathBuf,
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Convert JSON document collections into a tab-separated corpus
    Corpus {
        /// A `.json` file or a directory searched for them
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "corpus.txt")]
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct IndexArgs {
    /// Threads used to tokenize the corpus
    #[arg(long, default_value_t = 4)]
    workers: usize,
    /// Use idf = ln(N/df) instead of N/df
    #[arg(long, default_value_t = false)]
    log_idf: bool,
}

impl From<IndexArgs> for IndexOptions {
    fn from(args: IndexArgs) -> Self {
        IndexOptions { workers: args.workers, log_idf: args.log_idf }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { corpus, queries, output, index } => run(&corpus, &queries, &output, index.into()),
        Commands::Build { corpus, output, index } => {
            let engine = RetrievalEngine::index_corpus(&corpus, index.into())?;
            save_snapshot(&IndexPaths::new(&output), &engine)?;
            Ok(())
        }
        Commands::Corpus { input, output } => {
            let written = convert_corpus(&input, &output)?;
            tracing::info!(written, output = %output.display(), "corpus written");
            Ok(())
        }
    }
}

fn run(corpus: &Path, queries: &Path, output: &Path, options: IndexOptions) -> Result<()> {
    let engine = RetrievalEngine::index_corpus(corpus, options)?;
    let text = fs::read_to_string(queries)
        .with_context(|| format!("failed to read queries {}", queries.display()))?;
    let response = engine.run_queries(&preprocess_queries(&text));
    save_response(output, &response)?;
    tracing::info!(output = %output.display(), "results written");
    Ok(())
}

/// Every `.json` file under `input` (or `input` itself), in path order.
fn collection_files(input: &Path) -> Vec<PathBuf> {
    if input.is_file() {
        return vec![input.to_path_buf()];
    }
    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}

/// Write one corpus line per document summary with sequential ids. Returns
/// the number of documents written.
fn convert_corpus(input: &Path, output: &Path) -> Result<usize> {
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut out = BufWriter::new(File::create(output)?);
    let mut next_doc_id = 0usize;
    for file in collection_files(input) {
        let reader = BufReader::new(File::open(&file)?);
        let collection: InputCollection = match serde_json::from_reader(reader) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(file = %file.display(), error = %e, "not a document collection, skipping");
                continue;
            }
        };
        for doc in collection.documents {
            writeln!(out, "{}\t{}", next_doc_id, flatten(&doc.summary))?;
            next_doc_id += 1;
        }
    }
    out.flush()?;
    Ok(next_doc_id)
}

/// Tabs and line breaks would break the corpus line format.
fn flatten(text: &str) -> String {
    text.split(&['\t', '\n', '\r'][..]).filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use daat_core::persist::{load_response, load_snapshot};
    use tempfile::tempdir;

    #[test]
    fn flatten_removes_separators() {
        assert_eq!(flatten("a\tb\nc\r\nd"), "a b c d");
    }

    #[test]
    fn converts_a_folder_of_collections() {
        let dir = tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(docs.join("a.json"), r#"{"documents":[{"summary":"cat dog"},{"summary":"dog\tbird"}]}"#).unwrap();
        fs::write(docs.join("b.json"), r#"{"documents":[{"summary":"cat dog bird"}]}"#).unwrap();
        fs::write(docs.join("notes.txt"), "ignored").unwrap();
        fs::write(docs.join("bad.json"), "[1, 2]").unwrap();

        let corpus = dir.path().join("corpus.txt");
        assert_eq!(convert_corpus(&docs, &corpus).unwrap(), 3);
        let text = fs::read_to_string(&corpus).unwrap();
        assert_eq!(text, "0\tcat dog\n1\tdog bird\n2\tcat dog bird\n");
    }

    #[test]
    fn run_writes_results() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        let queries = dir.path().join("queries.txt");
        let output = dir.path().join("output.json");
        fs::write(&corpus, "0\tcat dog\n1\tdog bird\n2\tcat dog bird\n").unwrap();
        fs::write(&queries, "cat dog\n\nbird\n").unwrap();

        run(&corpus, &queries, &output, IndexOptions::default()).unwrap();
        let response = load_response(&output).unwrap();
        assert_eq!(response.daat_and["cat dog"].results, vec![0, 2]);
        assert_eq!(response.daat_and_tf_idf["bird"].num_docs, 2);
    }

    #[test]
    fn build_then_load_snapshot() {
        let dir = tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        fs::write(&corpus, "0\tcat dog\n1\tdog bird\n").unwrap();
        let engine = RetrievalEngine::index_corpus(&corpus, IndexOptions::default()).unwrap();
        let paths = IndexPaths::new(dir.path().join("index"));
        save_snapshot(&paths, &engine).unwrap();
        let loaded = load_snapshot(&paths).unwrap();
        assert_eq!(loaded.postings("dog"), vec![0, 1]);
    }
}
