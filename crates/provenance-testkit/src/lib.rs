//! # Provenance Testkit
//!
//! Testing utilities for Provenance.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known event logs with their canonical document,
//!   digests and signatures
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A kernel over a memory store with deterministic keys and
//!   a manual clock
//!
//! ## Golden Vectors
//!
//! ```rust
//! use provenance_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok) in verify_all_vectors() {
//!     assert!(ok, "{}", name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use provenance_core::canonical_bytes;
//! use provenance_testkit::generators::event_log;
//!
//! proptest! {
//!     #[test]
//!     fn canonical_bytes_are_deterministic(events in event_log(32)) {
//!         prop_assert_eq!(canonical_bytes(&events)?, canonical_bytes(&events)?);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use provenance_testkit::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let id = fixture.sealed_session("hello").await;
//!     assert!(fixture.kernel.verify(id).await.unwrap().is_verified());
//! }
//! ```

pub mod clock;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use clock::ManualClock;
pub use fixtures::{pem_keys, write_pem_keys, TestFixture, DEFAULT_SEED, T0_MICROS};
pub use vectors::{all_vectors, seal_vector, verify_all_vectors, GoldenVector};
