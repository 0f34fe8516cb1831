#![allow(dead_code)]

use simanalyzer::analysis::{Analyzer, AnalyzerSettings, Error, Frames};
use simanalyzer::jvm::class_graph::{ClassGraph, ClassGraphArenas};
use simanalyzer::jvm::code::Listing;

/// Log through `env_logger` (filtered by `RUST_LOG`), tolerating repeated initialization
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Parse a listing and run `body` with a class graph knowing about its classes
pub fn with_graph<T>(source: &str, body: impl FnOnce(&ClassGraph<'_>, &Listing) -> T) -> T {
    init_logging();
    let listing = Listing::parse(source).expect("fixture should parse");
    let arenas = ClassGraphArenas::new();
    let graph = ClassGraph::new(&arenas);
    graph.insert_java_library_types();
    listing.declare_classes(&graph);
    body(&graph, &listing)
}

/// Analyze one method of a listing with the default settings
pub fn analyze(source: &str, method: &str) -> Result<Frames, Error> {
    analyze_with_settings(source, method, AnalyzerSettings::default())
}

pub fn analyze_with_settings(
    source: &str,
    method: &str,
    settings: AnalyzerSettings,
) -> Result<Frames, Error> {
    with_graph(source, |graph, listing| {
        let method = listing.method(method).expect("fixture should have the method");
        Analyzer::new(graph).with_settings(settings).analyze(method)
    })
}
