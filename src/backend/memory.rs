use super::{Apply, ApplyBackend, Backend, Basic};
use crate::{Address, Word};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use primitive_types::U256;

/// Account information of a memory backend.
#[derive(Default, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "with-codec", derive(codec::Encode, codec::Decode))]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryAccount {
	/// Account nonce.
	pub nonce: U256,
	/// Account balance.
	pub balance: Word,
	/// Full account storage.
	pub storage: BTreeMap<Word, Word>,
	/// Account code.
	pub code: Vec<u8>,
}

/// Memory backend, storing all state values in a `BTreeMap` in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
	state: BTreeMap<Address, MemoryAccount>,
}

impl MemoryBackend {
	/// Create a new memory backend.
	pub fn new(state: BTreeMap<Address, MemoryAccount>) -> Self {
		Self { state }
	}

	/// Get the underlying `BTreeMap` storing the state.
	pub fn state(&self) -> &BTreeMap<Address, MemoryAccount> {
		&self.state
	}

	/// Get a mutable reference to the underlying `BTreeMap` storing the state.
	pub fn state_mut(&mut self) -> &mut BTreeMap<Address, MemoryAccount> {
		&mut self.state
	}
}

impl Backend for MemoryBackend {
	fn exists(&self, address: Address) -> bool {
		self.state.contains_key(&address)
	}

	fn basic(&self, address: Address) -> Basic {
		self.state
			.get(&address)
			.map(|a| Basic {
				balance: a.balance,
				nonce: a.nonce,
			})
			.unwrap_or_default()
	}

	fn code(&self, address: Address) -> Vec<u8> {
		self.state
			.get(&address)
			.map(|v| v.code.clone())
			.unwrap_or_default()
	}

	fn storage(&self, address: Address, key: Word) -> Word {
		self.state
			.get(&address)
			.and_then(|v| v.storage.get(&key).cloned())
			.unwrap_or_default()
	}
}

impl ApplyBackend for MemoryBackend {
	fn apply<A, I>(&mut self, values: A)
	where
		A: IntoIterator<Item = Apply<I>>,
		I: IntoIterator<Item = (Word, Word)>,
	{
		for apply in values {
			match apply {
				Apply::Modify {
					address,
					basic,
					code,
					storage,
					reset_storage,
				} => {
					let account = self.state.entry(address).or_insert_with(Default::default);
					account.balance = basic.balance;
					account.nonce = basic.nonce;
					if let Some(code) = code {
						account.code = code;
					}

					if reset_storage {
						account.storage = BTreeMap::new();
					}

					for (key, value) in storage {
						if value.is_zero() {
							account.storage.remove(&key);
						} else {
							account.storage.insert(key, value);
						}
					}
				}
				Apply::Delete { address } => {
					self.state.remove(&address);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn account(balance: u64) -> MemoryAccount {
		MemoryAccount {
			balance: Word::from(balance),
			..Default::default()
		}
	}

	#[test]
	fn missing_accounts_read_as_empty() {
		let backend = MemoryBackend::default();
		let address = Address::repeat_byte(7);

		assert!(!backend.exists(address));
		assert_eq!(backend.basic(address), Basic::default());
		assert!(backend.code(address).is_empty());
		assert_eq!(backend.storage(address, Word::ONE), Word::ZERO);
	}

	#[test]
	fn apply_modifies_and_deletes() {
		let a = Address::repeat_byte(1);
		let b = Address::repeat_byte(2);
		let mut state = BTreeMap::new();
		state.insert(a, account(10));
		let mut stored = account(5);
		stored.storage.insert(Word::ONE, Word::from(9u32));
		state.insert(b, stored);
		let mut backend = MemoryBackend::new(state);

		backend.apply(vec![
			Apply::Modify {
				address: a,
				basic: Basic {
					balance: Word::from(3u32),
					nonce: U256::one(),
				},
				code: Some(vec![0x60]),
				storage: vec![(Word::from(2u32), Word::from(4u32)), (Word::ONE, Word::ZERO)],
				reset_storage: false,
			},
			Apply::Delete { address: b },
		]);

		let stored = &backend.state()[&a];
		assert_eq!(stored.balance, Word::from(3u32));
		assert_eq!(stored.nonce, U256::one());
		assert_eq!(stored.code, vec![0x60]);
		assert_eq!(stored.storage.len(), 1);
		assert_eq!(backend.storage(a, Word::from(2u32)), Word::from(4u32));
		assert!(!backend.exists(b));
	}

	#[test]
	fn reset_storage_wipes_previous_slots() {
		let a = Address::repeat_byte(1);
		let mut stored = account(0);
		stored.storage.insert(Word::ONE, Word::ONE);
		let mut backend = MemoryBackend::new(core::iter::once((a, stored)).collect());

		backend.apply(vec![Apply::Modify {
			address: a,
			basic: Basic::default(),
			code: None,
			storage: Vec::new(),
			reset_storage: true,
		}]);

		assert_eq!(backend.storage(a, Word::ONE), Word::ZERO);
	}
}
