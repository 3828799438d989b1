//! # Bid Report Backend
//!
//! Collects bid events from external sources and turns each day's bids into a
//! grouped spreadsheet report that is mailed to a fixed recipient list.
//!
//! ## Architecture
//!
//! ```text
//! bid store ──▶ report builder ──▶ spreadsheet renderer ──▶ delivery
//! ```
//!
//! - [`api`]: record types shared by all layers
//! - [`config`]: environment and branch-order configuration
//! - [`db`]: repository pattern and persistence (in-memory or PostgreSQL)
//! - [`services`]: report builder, XLSX renderer, mailer and the report job
//! - [`scheduler`]: the daily trigger
//! - [`http`]: axum server with bid ingestion and the on-demand trigger

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod config;

pub mod db;

pub mod scheduler;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
