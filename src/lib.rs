//! Grounded question answering over a local document corpus.

pub mod core;
pub mod llm;
pub mod rag;
pub mod server;
pub mod state;
