//! Common test utilities for route adapter integration tests
//!
//! Provides backend setup and helpers for walking the route tree.

#![allow(dead_code)]

use autoroute::{
    AdapterConfig, Document, DocumentRepository, MemoryRepository, NodePath, OpenRepository,
    RepositoryAdapter, SqliteRepository,
};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// Base path every test route lives under
pub const BASE: &str = "/routes";

pub fn config() -> AdapterConfig {
    AdapterConfig::default().with_route_basepath(BASE)
}

/// Provision the base path on `repo` and build an adapter over it
pub fn adapter_for(repo: Arc<dyn DocumentRepository>) -> RepositoryAdapter {
    repo.provision_path(&NodePath::new(BASE))
        .expect("provision base path");
    RepositoryAdapter::new(repo, &config()).expect("build adapter")
}

/// One fresh repository per backend, labelled for assertion messages
pub fn backends() -> Vec<(&'static str, Arc<dyn DocumentRepository>)> {
    vec![
        ("memory", Arc::new(MemoryRepository::new())),
        (
            "sqlite",
            Arc::new(SqliteRepository::open_in_memory().expect("open sqlite")),
        ),
    ]
}

/// Run `check` against every backend
pub fn for_each_backend(check: impl Fn(&'static str, Arc<dyn DocumentRepository>, RepositoryAdapter)) {
    for (name, repo) in backends() {
        let adapter = adapter_for(repo.clone());
        check(name, repo, adapter);
    }
}

/// Every node strictly below `path`, depth first
pub fn descendants(repo: &dyn DocumentRepository, path: &NodePath) -> Vec<Document> {
    let mut found = Vec::new();
    for child in repo.children(path).expect("list children") {
        let child_path = child.path().clone();
        found.push(child);
        found.extend(descendants(repo, &child_path));
    }
    found
}

/// Names of the direct children of `path`, sorted
pub fn child_names(repo: &dyn DocumentRepository, path: &str) -> Vec<String> {
    let mut names: Vec<String> = repo
        .children(&NodePath::new(path))
        .expect("list children")
        .iter()
        .map(|doc| doc.node().name().to_string())
        .collect();
    names.sort();
    names
}

/// A URI of `segments` random lowercase segments
pub fn random_uri(rng: &mut StdRng, segments: usize) -> String {
    (0..segments)
        .map(|_| {
            let len = rng.gen_range(3..8);
            (0..len)
                .map(|_| rng.gen_range(b'a'..=b'z') as char)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("/")
}
