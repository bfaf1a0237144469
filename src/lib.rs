//! # feedsweep
//!
//! Marks unread items in a hosted feed reader as read when they match your
//! rules: sponsor posts, podcast announcements, anything you describe in the
//! config file.
//!
//! ## Architecture
//!
//! ```text
//! FeedClient (auth → unread ids → cache / batched fetch) → RuleSet → mark as read
//! ```
//!
//! - [`client`]: Feedbin API client with memoized authentication and batched fetching
//! - [`cache`]: On-disk item cache, pruned against the live unread set
//! - [`rules`]: The [`Rule`](rules::Rule) capability and the built-in rules
//! - [`engine`]: One filtering pass
//!
//! ## Quick Start
//!
//! ```bash
//! # See what would be marked as read
//! FEEDBIN_USERNAME=me@example.com FEEDBIN_PASSWORD=... feedsweep --dry-run
//!
//! # Do it
//! feedsweep run
//!
//! # Check credentials only
//! feedsweep check
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// cache, client, rules, engine.
pub mod app;

/// Local item cache.
///
/// - [`CacheHandle`](cache::CacheHandle): enabled cache or explicit disabled state
/// - [`FileCache`](cache::FileCache): one JSON file per item id
pub mod cache;

/// Command-line interface using clap.
///
/// - `run` - One filtering pass (default)
/// - `check` - Verify credentials
/// - `clear-cache` - Empty the item cache
pub mod cli;

/// Feed service access.
///
/// - [`FeedClient`](client::FeedClient): Async trait the engine talks to
/// - [`FeedbinClient`](client::FeedbinClient): Feedbin v2 implementation
/// - [`Transport`](client::Transport): HTTP seam, [`HttpTransport`](client::HttpTransport) in production
pub mod client;

/// Configuration loading: TOML file, environment, CLI flags.
pub mod config;

/// Core domain model: [`Item`](domain::Item).
pub mod domain;

/// The filtering pass and its [`RunReport`](engine::RunReport).
pub mod engine;

/// Rule predicates and the configured [`RuleSet`](rules::RuleSet).
pub mod rules;
