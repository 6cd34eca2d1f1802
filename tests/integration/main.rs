//! Integration tests for natstrace.
//!
//! The suite runs traced producers and consumers against the in-memory
//! broker, so it needs no external services.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test --test integration
//!
//! # With log output
//! RUST_LOG=natstrace=debug cargo test --test integration -- --nocapture
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;
mod consumer_tests;
mod envelope_tests;
mod producer_tests;
mod request_reply_tests;
