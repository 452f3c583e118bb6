//! # Prompt Bank Shared Library
//!
//! This crate contains the domain types, persistence layer and business rules
//! used by the Prompt Bank API server.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, session tokens, lockout rules, authorization
//! - `db`: Connection pool and migrations
//! - `models`: Database models and their queries
//! - `commands`: Typed, validated inputs for every mutation
//! - `services`: Mutation workflows (authorize, validate, apply, version, audit)
//! - `seed`: Startup bootstrap of the first admin and default categories

pub mod auth;
pub mod commands;
pub mod db;
pub mod models;
pub mod seed;
pub mod services;

/// Current version of the Prompt Bank shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
