//! # Prompt Bank API Server Library
//!
//! HTTP surface of the Prompt Bank: form-post mutations answered with
//! redirects, JSON reads, and session handling.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: HTTP middleware layers
//! - `routes`: Route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
