//! ualr-rag - Retrieval core for the UALR campus chatbot
//!
//! Embeds a user question with a local sentence-embedding model, searches a
//! prebuilt similarity index over the campus corpus, and joins the hits with
//! their passage text and source metadata. Prompt construction and answer
//! generation happen elsewhere; this crate only decides which passages are
//! relevant.

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod index;
pub mod indexer;
pub mod retrieval;

pub use error::{ErrorKind, RagError, Result};
