//! Campus scenarios against the real sentence-embedding model

use std::fs;
use tempfile::TempDir;
use ualr_rag::config::Config;
use ualr_rag::embedding::{create_provider, EmbeddingProvider, FastEmbedProvider};
use ualr_rag::indexer::{parse_corpus, IndexBuilder};
use ualr_rag::retrieval::Retriever;

const CORPUS: &str = r#"{"id": 0, "content": "UALR library hours are 9-5", "metadata": {"source": "https://ualr.edu/library/"}}
{"id": 1, "content": "Financial aid office: finaid@ualr.edu", "metadata": {"source": "https://ualr.edu/finaid/"}}
{"id": 2, "content": "Parking permits cost $50", "metadata": {"source": "https://ualr.edu/parking/"}}
"#;

#[test]
#[ignore] // Requires model download
fn test_semantic_campus_queries() {
    let temp = TempDir::new().unwrap();
    let mut config = Config::default();
    config.artifacts.index_path = temp.path().join("corpus.idx");
    config.artifacts.metadata_path = temp.path().join("doc_metadata.json");

    let provider = create_provider(&config.embedding).unwrap();
    assert_eq!(provider.dimension(), 384);

    IndexBuilder::new(provider, config.embedding.batch_size)
        .write(
            parse_corpus(CORPUS).unwrap(),
            &config.artifacts.index_path,
            &config.artifacts.metadata_path,
        )
        .unwrap();

    let retriever = Retriever::load(&config).unwrap();

    let results = retriever.retrieve("When is the library open?", 1).unwrap();
    assert_eq!(results[0].id, 0);

    let results = retriever.retrieve("How do I contact financial aid?", 1).unwrap();
    assert_eq!(results[0].id, 1);

    let results = retriever.retrieve("How much is a parking permit?", 1).unwrap();
    assert_eq!(results[0].id, 2);
    assert_eq!(results[0].metadata["source"], "https://ualr.edu/parking/");

    let results = retriever.retrieve("When is the library open?", 5).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
#[ignore] // Requires model download
fn test_long_query_truncated() {
    let provider = FastEmbedProvider::with_default_model().unwrap();
    let long = "library ".repeat(2000);

    let first = provider.embed(&long).unwrap();
    let second = provider.embed(&long).unwrap();
    assert_eq!(first.len(), 384);
    assert_eq!(first, second);

    let norm: f32 = first.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() < 1e-4);
}

#[test]
#[ignore] // Requires model download
fn test_corpus_file_build() {
    let temp = TempDir::new().unwrap();
    let corpus_path = temp.path().join("corpus.jsonl");
    fs::write(&corpus_path, CORPUS).unwrap();

    let config = Config::default();
    let provider = create_provider(&config.embedding).unwrap();
    let (index, metadata) = IndexBuilder::new(provider, 2)
        .build(ualr_rag::indexer::load_corpus(&corpus_path).unwrap())
        .unwrap();

    assert_eq!(index.build_id(), metadata.build_id);
    assert_eq!(metadata.embedding_model, "all-MiniLM-L6-v2");
}
