//! Core value types of the FastVM transaction executor.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod bloom;
mod error;
mod word;

pub use crate::bloom::{Bloom, BLOOM_BYTES};
pub use crate::error::{Capture, ExitError, ExitFatal, ExitReason};
pub use crate::word::{Word, WordError};

pub use primitive_types::{H256, U128, U256};

/// Account address. Addresses are 32 bytes wide.
pub type Address = H256;

/// Byte length of an [`Address`].
pub const ADDRESS_LEN: usize = 32;
