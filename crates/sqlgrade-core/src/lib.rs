pub mod config;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod fingerprint;
pub mod model;
pub mod package;
pub mod render;
pub mod report;
pub mod sandbox;
pub mod statements;
