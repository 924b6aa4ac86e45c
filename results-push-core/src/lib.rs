#![doc = "results-push-core: core logic library for results-push."]

//! Registry handling, artifact discovery, remote publishing, trajectory
//! ingestion and report reconciliation. Network clients live in the CLI
//! crate and plug in through the traits in [`contract`].

pub mod config;
pub mod contract;
pub mod error;
pub mod ingest;
pub mod layout;
pub mod publish;
pub mod registry;
pub mod report_sync;
pub mod resolver;
pub mod synchronise;
