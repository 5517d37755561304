//! # Account state repository
//!
//! The executor only reads durable state through [`Backend`] and writes it
//! back once, at the end of a transaction, through [`ApplyBackend`].

mod memory;

pub use self::memory::{MemoryAccount, MemoryBackend};

use crate::{Address, Bloom, Word};
use alloc::vec::Vec;
use primitive_types::{H256, U256};
use sha3::{Digest, Keccak256};

/// Basic account information.
#[derive(Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(
	feature = "with-codec",
	derive(codec::Encode, codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Basic {
	/// Account balance.
	pub balance: Word,
	/// Account nonce.
	pub nonce: U256,
}

/// A log entry emitted by a frame.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
	feature = "with-codec",
	derive(codec::Encode, codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Log {
	pub address: Address,
	pub topics: Vec<H256>,
	pub data: Vec<u8>,
}

impl Log {
	/// Bloom of the Keccak-256 hashes of the address and every topic.
	pub fn bloom(&self) -> Bloom {
		let mut bloom = Bloom::new();
		bloom.accrue(&keccak(self.address.as_bytes()));
		for topic in &self.topics {
			bloom.accrue(&keccak(topic.as_bytes()));
		}
		bloom
	}
}

/// Union of the blooms of `logs`.
pub fn logs_bloom<'a, I>(logs: I) -> Bloom
where
	I: IntoIterator<Item = &'a Log>,
{
	let mut bloom = Bloom::new();
	for log in logs {
		bloom.union(&log.bloom());
	}
	bloom
}

fn keccak(data: &[u8]) -> H256 {
	H256::from_slice(Keccak256::digest(data).as_slice())
}

/// Apply state operation.
#[derive(Clone, Debug)]
pub enum Apply<I> {
	/// Modify or create at address.
	Modify {
		/// Address.
		address: Address,
		/// Basic information of the address.
		basic: Basic,
		/// Code. `None` means leaving it unchanged.
		code: Option<Vec<u8>>,
		/// Storage iterator.
		storage: I,
		/// Whether storage should be wiped empty before applying the storage
		/// iterator.
		reset_storage: bool,
	},
	/// Delete at address.
	Delete {
		/// Address.
		address: Address,
	},
}

/// Read access to durable account state.
#[auto_impl::auto_impl(&, &mut, Box)]
pub trait Backend {
	/// Whether account at address exists.
	fn exists(&self, address: Address) -> bool;
	/// Get basic account information.
	fn basic(&self, address: Address) -> Basic;
	/// Get account code.
	fn code(&self, address: Address) -> Vec<u8>;
	/// Get storage value of address at key.
	fn storage(&self, address: Address, key: Word) -> Word;
}

/// Backend that can merge a finished transaction into durable state.
pub trait ApplyBackend {
	/// Apply given values.
	fn apply<A, I>(&mut self, values: A)
	where
		A: IntoIterator<Item = Apply<I>>,
		I: IntoIterator<Item = (Word, Word)>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn log_bloom_covers_address_and_topics() {
		let log = Log {
			address: Address::repeat_byte(0xa0),
			topics: vec![H256::repeat_byte(1), H256::repeat_byte(2)],
			data: vec![0xde, 0xad],
		};
		let bloom = log.bloom();

		assert!(bloom.contains_hash(&keccak(log.address.as_bytes())));
		assert!(bloom.contains_hash(&keccak(log.topics[0].as_bytes())));
		assert!(bloom.contains_hash(&keccak(log.topics[1].as_bytes())));
	}

	#[test]
	fn logs_bloom_is_union() {
		let a = Log {
			address: Address::repeat_byte(1),
			topics: vec![],
			data: vec![],
		};
		let b = Log {
			address: Address::repeat_byte(2),
			topics: vec![H256::repeat_byte(3)],
			data: vec![],
		};
		let bloom = logs_bloom([&a, &b]);

		assert!(bloom.contains(&a.bloom()));
		assert!(bloom.contains(&b.bloom()));
		assert!(logs_bloom(core::iter::empty::<&Log>()).is_empty());
	}
}
