//! Key generation for threshold ML-DSA.
//!
//! Two approaches produce the same key material shape:
//!
//! 1. **Trusted Dealer** - a single party derives everything from one seed
//! 2. **Distributed Key Generation (DKG)** - parties collaboratively
//!    generate shares without any single party seeing the full secret
//!
//! # Trusted Dealer
//!
//! `generate_with_dealer` generates all key shares from a single seed. The
//! dealer (the entity running this function) must be trusted not to retain
//! the shares or the seed.
//!
//! ```ignore
//! use permafrost_threshold::{generate_with_dealer, ThresholdConfig};
//! use permafrost_mldsa::SecurityLevel;
//!
//! let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44)?;
//! let seed = [0u8; 32]; // Use a cryptographically secure random seed!
//!
//! let (public_key, shares) = generate_with_dealer(&seed, &config)?;
//!
//! // Distribute shares[0] to party 0, shares[1] to party 1, etc.
//! ```
//!
//! # Distributed Key Generation
//!
//! The DKG runs in four phases driven by a typed state machine: commit,
//! reveal, mask-piece distribution, and aggregation. See [`dkg`] for a full
//! walkthrough. This is the recommended approach for production deployments.

mod dealer;
pub mod dkg;

pub use dealer::generate_with_dealer;
