mod common;

use assert2::{check, let_assert};
use common::{GatedSource, TempWorkspace, directory_source, fixture_text, manifest};
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::Arc;
use symbol_search::LoadError;
use symbol_search::index::{
    CatalogManifest, DirectorySource, IndexCatalog, MANIFEST_FILE, ShardSource, SymbolKind,
};

#[rstest]
#[tokio::test]
async fn test_loads_generated_shard(manifest: CatalogManifest, directory_source: Arc<DirectorySource>) {
    let catalog = IndexCatalog::new(manifest, directory_source);
    let_assert!(Ok(shard) = catalog.load("all", 'r').await);

    check!(shard.len() == 25);
    let keys: Vec<_> = shard.entries().iter().map(|e| e.key.as_str()).collect();
    check!(keys.windows(2).all(|w| w[0] < w[1]));

    let position = |key: &str| keys.iter().position(|k| *k == key);
    check!(position("rand_5ffast") < position("randlisttype"));
    check!(position("randlisttype") < position("randnorm"));

    let_assert!(Some(norm) = shard.get("randnorm"));
    check!(norm.label == "RandNorm");
    check!(norm.occurrences.len() == 2);
    check!(norm.occurrences[0].container_label == "RandNorm(double mean, double stddev):\u{a0}rands.c");
    check!(norm.occurrences[0].kind_hint == Some(SymbolKind::Function));

    let_assert!(Some(file) = shard.get("rands_2eh"));
    check!(file.occurrences[0].container_label.is_empty());
    check!(file.occurrences[0].kind_hint == Some(SymbolKind::File));

    let_assert!(Some(member) = shard.get("rmeltmax"));
    check!(member.occurrences[0].kind_hint == Some(SymbolKind::Member));
}

#[rstest]
#[tokio::test]
async fn test_empty_partition_loads(manifest: CatalogManifest, directory_source: Arc<DirectorySource>) {
    let catalog = IndexCatalog::new(manifest, directory_source);
    let_assert!(Ok(shard) = catalog.load("all", 'q').await);
    check!(shard.is_empty());
    check!(catalog.is_loaded("all", 'q'));
}

#[rstest]
#[tokio::test]
async fn test_missing_payloads(manifest: CatalogManifest, directory_source: Arc<DirectorySource>) {
    let catalog = IndexCatalog::new(manifest, directory_source);

    let_assert!(Err(LoadError::NotFound { section, partition: 'r' }) = catalog.load("functions", 'r').await);
    check!(section == "functions");

    // Not a partition of the section at all
    let_assert!(Err(LoadError::NotFound { .. }) = catalog.load("files", 'x').await);
    let_assert!(Err(LoadError::NotFound { .. }) = catalog.load("classes", 'r').await);

    check!(catalog.loaded_shards("functions").is_empty());
    check!(catalog.entries_for("functions", 'r').is_empty());
}

#[rstest]
#[tokio::test]
async fn test_concurrent_loads_share_one_fetch(
    manifest: CatalogManifest,
    directory_source: Arc<DirectorySource>,
) {
    let source = Arc::new(GatedSource::closed(directory_source));
    let catalog = IndexCatalog::new(manifest, source.clone());

    let first = tokio::spawn({
        let catalog = catalog.clone();
        async move { catalog.load("all", 'r').await }
    });
    let second = tokio::spawn({
        let catalog = catalog.clone();
        async move { catalog.load("all", 'r').await }
    });

    while !catalog.is_loading("all", 'r') {
        tokio::task::yield_now().await;
    }
    check!(!catalog.is_loaded("all", 'r'));

    source.release(1);
    let_assert!(Ok(Ok(a)) = first.await);
    let_assert!(Ok(Ok(b)) = second.await);

    check!(Arc::ptr_eq(&a, &b));
    check!(source.fetches() == 1);
    check!(!catalog.is_loading("all", 'r'));

    // Cached from now on
    let_assert!(Ok(_) = catalog.load("all", 'r').await);
    check!(source.fetches() == 1);
}

#[rstest]
#[tokio::test]
async fn test_ensure_loaded(manifest: CatalogManifest, directory_source: Arc<DirectorySource>) {
    let source = Arc::new(GatedSource::open(directory_source));
    let catalog = IndexCatalog::new(manifest, source.clone());

    let partitions = BTreeSet::from(['q', 'r']);
    let_assert!(Ok(()) = catalog.ensure_loaded("all", &partitions).await);
    check!(catalog.is_loaded("all", 'q'));
    check!(catalog.is_loaded("all", 'r'));
    check!(source.fetches() == 2);

    let shards = catalog.loaded_shards("all");
    check!(shards.iter().map(|s| s.partition()).collect::<Vec<_>>() == ['q', 'r']);

    // Already cached partitions are not fetched again
    let_assert!(Ok(()) = catalog.ensure_loaded("all", &partitions).await);
    check!(source.fetches() == 2);

    // A failing partition is reported but does not stop the others
    let partitions = BTreeSet::from(['a', 'q']);
    let_assert!(Err(LoadError::NotFound { partition: 'a', .. }) = catalog.ensure_loaded("all", &partitions).await);
    check!(catalog.is_loaded("all", 'q'));
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let workspace = TempWorkspace::new();
    workspace.copy_fixture(MANIFEST_FILE);
    workspace.create_file("search/all_11.js", "var searchData=[['rain',");

    let source = Arc::new(GatedSource::open(Arc::new(DirectorySource::new(workspace.search_dir()))));
    let_assert!(Ok(manifest) = DirectorySource::new(workspace.search_dir()).manifest().await);
    let catalog = IndexCatalog::new(manifest, source.clone());

    let_assert!(Err(LoadError::Malformed { partition: 'r', .. }) = catalog.load("all", 'r').await);
    check!(!catalog.is_loaded("all", 'r'));
    check!(!catalog.is_loading("all", 'r'));

    // Fixed on disk; the next request fetches again
    workspace.copy_fixture("all_11.js");
    let_assert!(Ok(shard) = catalog.load("all", 'r').await);
    check!(shard.len() == 25);
    check!(source.fetches() == 2);
}

#[tokio::test]
async fn test_directory_source_rejects_paths() {
    let source = DirectorySource::new(common::fixture_dir());
    let_assert!(Ok(text) = source.fetch("all_10.js").await);
    check!(text == fixture_text("all_10.js"));

    let_assert!(Err(_) = source.fetch("../fixtures/search/all_10.js").await);
    let_assert!(Err(_) = source.fetch(".hidden").await);
    let_assert!(Err(_) = source.fetch("missing_0.js").await);
}
