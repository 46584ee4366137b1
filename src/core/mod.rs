pub mod logging;

// Query-side text normalization: tsheg tokens, EWTS, honorific stripping
pub mod preprocess;

// Relevance query synthesis, catalog requests and the index client
pub mod search;
