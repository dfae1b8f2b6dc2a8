//! # OU Modules Resolver
//!
//! Turns course codes mentioned in chat into titles and canonical URLs.
//!
//! ## Pipeline
//!
//! ```text
//! Message text
//!     │
//!     ├──> Code Matcher (`!CODE`, deduplicated, capped)
//!     │      └─> Codes
//!     │
//!     └──> Resolution Engine (per code, concurrently)
//!            ├─ Module cache (bundled snapshot, enriched in memory)
//!            │    └─ url-less entries are re-probed via the Liveness Checker
//!            └─ Raced strategies, first hit wins:
//!                 ├─ SPARQL query (current + legacy catalogues)
//!                 ├─ Scrape (live course page `<title>`)
//!                 └─ Digital archive (title only, no url)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use oumodules_resolver::{CodeMatcher, MemoryCache, ResolutionEngine, ResolverConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(MemoryCache::bundled()?);
//!     let engine = ResolutionEngine::from_config(&ResolverConfig::default(), cache)?;
//!
//!     let codes = CodeMatcher::mentions().find_unique("is !M269 harder than !M250?");
//!     for lookup in engine.resolve_all(&codes).await {
//!         println!("{:?}", lookup);
//!     }
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod engine;
mod error;
mod html;
mod http;
mod liveness;
mod matcher;
mod sparql;
mod strategy;
mod urls;

pub use cache::{MemoryCache, ModuleCache};
pub use config::{LookupMode, ResolverConfig};
pub use engine::ResolutionEngine;
pub use error::{ResolverError, Result};
pub use html::{find_archive_title, find_title_in_html};
pub use http::build_client;
pub use liveness::LivenessChecker;
pub use matcher::{dedup_codes, CodeMatcher, MENTION_MARKER, MODULES_COUNT_LIMIT};
pub use sparql::{exact_code_filter, Binding, CourseDataset, SparqlClient};
pub use strategy::{ArchiveStrategy, LookupStrategy, ScrapeStrategy, SparqlStrategy};
pub use urls::{level_of, UrlTemplates};
