use daat_core::persist::{load_response, load_snapshot, save_response, save_snapshot, IndexPaths};
use daat_core::preprocess::preprocess_queries;
use daat_core::{IndexOptions, MergeOutcome, PostingsList, RetrievalEngine};
use std::fs;
use tempfile::tempdir;

const CORPUS: &str = "0\tcat dog\n1\tdog bird\n2\tcat dog bird\n";

fn engine_from(corpus: &str) -> RetrievalEngine {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.txt");
    fs::write(&path, corpus).unwrap();
    RetrievalEngine::index_corpus(&path, IndexOptions { workers: 2, log_idf: false }).unwrap()
}

#[test]
fn animals_scenario() {
    let engine = engine_from(CORPUS);
    let response = engine.run_queries(&preprocess_queries("dog\ncat dog\n"));

    assert_eq!(response.postings_list["dog"], vec![0, 1, 2]);
    let both = &response.daat_and["cat dog"];
    assert_eq!(both.results, vec![0, 2]);
    assert_eq!(both.num_docs, 2);
    assert_eq!(response.daat_and_skip["cat dog"].results, vec![0, 2]);
}

#[test]
fn absent_term_yields_nothing() {
    let engine = engine_from("0\tyarn\n1\tyarn zinc\n2\tzinc yarn\n");
    assert_eq!(engine.postings("yarn"), vec![0, 1, 2]);
    let response = engine.run_queries(&preprocess_queries("xeno yarn"));

    assert_eq!(response.postings_list["xeno"], Vec::<u32>::new());
    for outcomes in [
        &response.daat_and,
        &response.daat_and_skip,
        &response.daat_and_tf_idf,
        &response.daat_and_skip_tf_idf,
    ] {
        assert_eq!(outcomes["xeno yarn"], MergeOutcome::default());
    }
}

#[test]
fn only_absent_terms() {
    let engine = engine_from(CORPUS);
    let response = engine.run_queries(&preprocess_queries("zebra giraffe"));
    let outcome = &response.daat_and["zebra giraffe"];
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.num_comparisons, 0);
}

#[test]
fn malformed_lines_do_not_stop_indexing() {
    let engine = engine_from("0\tcat\nbroken line\nnope\tcat\n\n3\tcat dog\n");
    assert_eq!(engine.index().num_docs(), 2);
    assert_eq!(engine.postings("cat"), vec![0, 3]);
}

#[test]
fn invalid_utf8_line_does_not_stop_indexing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("corpus.txt");
    fs::write(&path, b"0\tcat dog\n1\tbad \xff\xfe byte\n2\tcat dog bird\n").unwrap();
    let engine = RetrievalEngine::index_corpus(&path, IndexOptions::default()).unwrap();
    assert_eq!(engine.index().num_docs(), 2);
    assert_eq!(engine.postings("cat"), vec![0, 2]);
}

#[test]
fn unreadable_corpus_fails_before_querying() {
    let err = RetrievalEngine::index_corpus("/no/such/corpus.txt", IndexOptions::default()).unwrap_err();
    assert!(err.to_string().contains("/no/such/corpus.txt"));
}

#[test]
fn snapshot_round_trip() {
    let engine = engine_from("5\tred green\n1\tgreen blue\n9\tred red blue green\n3\tblue\n");
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path().join("index"));
    let meta = save_snapshot(&paths, &engine).unwrap();
    assert_eq!(meta.num_docs, 4);
    assert_eq!(meta.num_terms, 3);

    let restored = load_snapshot(&paths).unwrap();
    for (term, list) in engine.index().iter() {
        let other = restored.index().lookup(term).unwrap();
        assert_eq!(other.triples(), list.triples(), "{term}");
        assert_eq!(other.skip_interval(), list.skip_interval());
        let scores: Vec<f64> = other.traverse().map(|p| p.score()).collect();
        let expected: Vec<f64> = list.traverse().map(|p| p.score()).collect();
        assert_eq!(scores, expected);
    }

    let queries = preprocess_queries("red blue\ngreen");
    assert_eq!(restored.run_queries(&queries), engine.run_queries(&queries));
}

#[test]
fn triples_rebuild_same_order() {
    let engine = engine_from("4\tsun\n0\tsun moon\n7\tmoon sun sun\n2\tsun\n");
    let original = engine.index().lookup("sun").unwrap();
    let mut triples = original.triples();
    triples.reverse();
    let rebuilt: PostingsList = triples
        .into_iter()
        .map(|(d, tf, len)| daat_core::Posting::new(d, tf, len))
        .collect();
    assert_eq!(rebuilt.doc_ids(), original.doc_ids());
    assert_eq!(rebuilt.doc_ids(), vec![0, 2, 4, 7]);
}

#[test]
fn response_file_round_trip() {
    let engine = engine_from(CORPUS);
    let response = engine.run_queries(&preprocess_queries("cat dog\nbird"));
    let dir = tempdir().unwrap();
    let path = dir.path().join("out/output.json");
    save_response(&path, &response).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"daatAndSkipTfIdf\""));
    assert_eq!(load_response(&path).unwrap(), response);
}
