//! Search orchestrator: per-wiki fan-out, filtering, bounded ranking, caching.
//!
//! This module queries every registered wiki concurrently, drops each
//! wiki's home page, optionally rewrites titles, ranks everything into
//! one bounded collection and caches the answer per registry generation.

pub mod search;
pub mod titles;
