//! Core ML-DSA (FIPS 204) primitives for the PERMAFROST threshold scheme.
//!
//! This crate provides the lattice machinery shared by every part of the
//! threshold protocol: ring arithmetic over R_q = Z_q[X]/(X^256+1), the
//! number-theoretic transform, rejection sampling, the FIPS 204 byte codecs,
//! and standard (single-signer) signature verification.
//!
//! All three security levels (ML-DSA-44/65/87) are supported through a
//! runtime [`SecurityLevel`] selector; see [`params`].

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod ntt;
pub mod packing;
pub mod params;
pub mod poly;
pub mod rounding;
pub mod sampling;
pub mod shake;
pub mod verify;

mod errors;

pub use errors::CodecError;
pub use params::{ParamSet, SecurityLevel};
pub use poly::{Poly, PolyVec};
