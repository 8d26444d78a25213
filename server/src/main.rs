use anyhow::{bail, Result};
use clap::Parser;
use daat_core::persist::{load_snapshot, IndexPaths};
use daat_core::{IndexOptions, RetrievalEngine};
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Corpus file to index at startup
    #[arg(long, conflicts_with = "index")]
    corpus: Option<PathBuf>,
    /// Snapshot directory written by `indexer build`
    #[arg(long)]
    index: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 9999)]
    port: u16,
    /// Threads used to tokenize the corpus
    #[arg(long, default_value_t = 4, conflicts_with = "index")]
    workers: usize,
    /// Use idf = ln(N/df) instead of N/df; a snapshot keeps its own setting
    #[arg(long, default_value_t = false, conflicts_with = "index")]
    log_idf: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    // the whole index is built before the listener opens
    let engine = match (&args.corpus, &args.index) {
        (Some(corpus), _) => RetrievalEngine::index_corpus(corpus, IndexOptions { workers: args.workers, log_idf: args.log_idf })?,
        (None, Some(dir)) => load_snapshot(&IndexPaths::new(dir))?,
        (None, None) => bail!("either --corpus or --index is required"),
    };
    let app = build_app(Arc::new(engine));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_options_only_apply_to_a_corpus() {
        let args = Args::try_parse_from(["server", "--corpus", "c.txt", "--log-idf", "--workers", "2"]).unwrap();
        assert!(args.log_idf);
        assert_eq!(args.workers, 2);
        assert!(Args::try_parse_from(["server", "--index", "./index"]).is_ok());
        assert!(Args::try_parse_from(["server", "--index", "./index", "--log-idf"]).is_err());
        assert!(Args::try_parse_from(["server", "--index", "./index", "--workers", "8"]).is_err());
    }
}
