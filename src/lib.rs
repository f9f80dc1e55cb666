//! reconnoiter - crawl-and-deduplicate reconnaissance engine
//!
//! Crawls a web application from seed URLs, discovers same-scope endpoints in
//! pages and script assets, and suppresses pages that repeat content already
//! seen: visited URLs, repeated titles, near-duplicate text and near-duplicate
//! DOM layouts.

pub mod config;
pub mod crawler;
pub mod dedup;
pub mod error;
pub mod http;
pub mod models;
pub mod report;
pub mod scope;
