//! # gorag
//!
//! A retrieval-augmented generation gateway.
//!
//! gorag accepts a user query, embeds it with a remote embedding service,
//! retrieves relevant passages from a Qdrant collection named after the
//! embedding model, grounds a chat prompt on them, and streams the
//! generation service's answer back to the caller chunk by chunk.
//!
//! ## Architecture
//!
//! ```text
//!               ┌──────────────┐   ┌──────────────┐
//!  query ──────▶│  Embedding   │──▶│  Collection  │
//!               │   service    │   │    naming    │
//!               └──────────────┘   └──────┬───────┘
//!                                         ▼
//!               ┌──────────────┐   ┌──────────────┐
//!               │  Relevance   │◀──│    Qdrant    │
//!               │   filter     │   │    search    │
//!               └──────┬───────┘   └──────────────┘
//!                      ▼
//!               ┌──────────────┐   ┌──────────────┐
//!               │    Prompt    │──▶│  Generation  │──▶ chunks
//!               │   assembly   │   │   (stream)   │
//!               └──────────────┘   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! gorag collection models/nomic_embed.Q8.gguf   # which collection a model uses
//! gorag embed "hello world"                     # check the embedding service
//! gorag ask "what is in the handbook?"          # full pipeline, answer on stdout
//! gorag serve                                   # start the HTTP gateway
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline error taxonomy |
//! | [`embedding`] | Embedding service client |
//! | [`collection`] | Collection naming from model identity |
//! | [`index`] | Vector index trait, Qdrant and in-memory backends |
//! | [`relevance`] | Score cutoff and passage extraction |
//! | [`prompt`] | Grounded prompt assembly |
//! | [`completion`] | Streaming completion relay |
//! | [`pipeline`] | End-to-end request pipeline |
//! | [`server`] | HTTP server |
//! | [`telemetry`] | Tracing subscriber setup |

pub mod collection;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod relevance;
pub mod server;
pub mod telemetry;
