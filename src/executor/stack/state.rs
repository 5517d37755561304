use super::{StackExitKind, StackSubstateMetadata};
use crate::backend::{Apply, Backend, Basic};
use crate::{Address, ExitError, ExitFatal, Word};
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use primitive_types::U256;

#[derive(Clone, Debug, Default)]
struct TrackedAccount {
	basic: Basic,
	code: Option<Vec<u8>>,
	reset: bool,
}

#[derive(Debug)]
struct Substate<'config> {
	metadata: StackSubstateMetadata<'config>,
	parent: Option<usize>,
	accounts: BTreeMap<Address, TrackedAccount>,
	storages: BTreeMap<(Address, Word), Word>,
	deletes: BTreeSet<Address>,
}

impl<'config> Substate<'config> {
	fn new(metadata: StackSubstateMetadata<'config>, parent: Option<usize>) -> Self {
		Self {
			metadata,
			parent,
			accounts: BTreeMap::new(),
			storages: BTreeMap::new(),
			deletes: BTreeSet::new(),
		}
	}
}

/// Copy-on-write view over a [`Backend`].
///
/// Substates live in an arena indexed by position. Index 0 belongs to the
/// transaction itself; every entered frame pushes one more and points at
/// its parent by index. Reads walk the parent chain before falling through
/// to the backend; writes only ever touch the newest substate.
#[derive(Debug)]
pub struct TrackedState<'config> {
	substates: Vec<Substate<'config>>,
}

impl<'config> TrackedState<'config> {
	pub fn new(metadata: StackSubstateMetadata<'config>) -> Self {
		Self {
			substates: alloc::vec![Substate::new(metadata, None)],
		}
	}

	fn current(&self) -> usize {
		self.substates.len() - 1
	}

	/// Number of frames entered on top of the transaction level.
	pub fn entered(&self) -> usize {
		self.current()
	}

	pub fn metadata(&self) -> &StackSubstateMetadata<'config> {
		&self.substates[self.current()].metadata
	}

	pub fn metadata_mut(&mut self) -> &mut StackSubstateMetadata<'config> {
		let current = self.current();
		&mut self.substates[current].metadata
	}

	pub fn enter(&mut self, gas_limit: u64, is_static: bool) {
		let current = self.current();
		let metadata = self.substates[current]
			.metadata
			.spit_child(gas_limit, is_static);
		self.substates.push(Substate::new(metadata, Some(current)));
	}

	pub fn exit(&mut self, kind: StackExitKind) -> Result<(), ExitFatal> {
		match kind {
			StackExitKind::Succeeded => self.exit_commit(),
			StackExitKind::Reverted => self.exit_revert(),
			StackExitKind::Failed => self.exit_discard(),
		}
	}

	fn pop(&mut self) -> Result<(Substate<'config>, &mut Substate<'config>), ExitFatal> {
		if self.substates.len() < 2 {
			return Err(ExitFatal::Other("cannot exit the transaction substate"));
		}
		let exited = self
			.substates
			.pop()
			.ok_or(ExitFatal::Other("cannot exit the transaction substate"))?;
		let parent = exited
			.parent
			.ok_or(ExitFatal::Other("entered substate without parent"))?;
		Ok((exited, &mut self.substates[parent]))
	}

	pub fn exit_commit(&mut self) -> Result<(), ExitFatal> {
		let (exited, parent) = self.pop()?;

		parent.metadata.swallow_commit(exited.metadata);
		for (address, mut account) in exited.accounts {
			if account.reset {
				parent.storages.retain(|(a, _), _| *a != address);
			}
			// a reset made by an ancestor still hides durable slots
			if let Some(known) = parent.accounts.get(&address) {
				account.reset |= known.reset;
			}
			parent.accounts.insert(address, account);
		}
		parent.storages.extend(exited.storages);
		parent.deletes.extend(exited.deletes);

		Ok(())
	}

	pub fn exit_revert(&mut self) -> Result<(), ExitFatal> {
		let (exited, parent) = self.pop()?;
		parent.metadata.swallow_revert(exited.metadata);
		Ok(())
	}

	pub fn exit_discard(&mut self) -> Result<(), ExitFatal> {
		let (exited, parent) = self.pop()?;
		parent.metadata.swallow_discard(exited.metadata);
		Ok(())
	}

	/// Substates from the newest back to the transaction level.
	fn chain(&self) -> impl Iterator<Item = &Substate<'config>> + '_ {
		let mut cursor = Some(self.current());
		core::iter::from_fn(move || {
			let substate = &self.substates[cursor?];
			cursor = substate.parent;
			Some(substate)
		})
	}

	fn known_account(&self, address: Address) -> Option<&TrackedAccount> {
		self.chain().find_map(|substate| substate.accounts.get(&address))
	}

	pub fn basic<B: Backend>(&self, address: Address, backend: &B) -> Basic {
		self.known_account(address)
			.map(|account| account.basic.clone())
			.unwrap_or_else(|| backend.basic(address))
	}

	pub fn code<B: Backend>(&self, address: Address, backend: &B) -> Vec<u8> {
		self.known_account(address)
			.and_then(|account| account.code.clone())
			.unwrap_or_else(|| backend.code(address))
	}

	pub fn storage<B: Backend>(&self, address: Address, key: Word, backend: &B) -> Word {
		for substate in self.chain() {
			if let Some(value) = substate.storages.get(&(address, key)) {
				return *value;
			}
			if substate
				.accounts
				.get(&address)
				.map_or(false, |account| account.reset)
			{
				return Word::ZERO;
			}
		}
		backend.storage(address, key)
	}

	pub fn exists<B: Backend>(&self, address: Address, backend: &B) -> bool {
		self.known_account(address).is_some() || backend.exists(address)
	}

	pub fn deleted(&self, address: Address) -> bool {
		self.chain()
			.any(|substate| substate.deletes.contains(&address))
	}

	fn account_mut<B: Backend>(&mut self, address: Address, backend: &B) -> &mut TrackedAccount {
		let current = self.current();
		let seed = if self.substates[current].accounts.contains_key(&address) {
			None
		} else {
			self.known_account(address).cloned().map(|account| TrackedAccount {
				reset: false,
				..account
			})
		};
		self.substates[current]
			.accounts
			.entry(address)
			.or_insert_with(|| {
				seed.unwrap_or_else(|| TrackedAccount {
					basic: backend.basic(address),
					code: None,
					reset: false,
				})
			})
	}

	pub fn inc_nonce<B: Backend>(&mut self, address: Address, backend: &B) {
		let account = self.account_mut(address, backend);
		account.basic.nonce = account.basic.nonce.saturating_add(U256::one());
	}

	pub fn set_storage(&mut self, address: Address, key: Word, value: Word) {
		let current = self.current();
		self.substates[current]
			.storages
			.insert((address, key), value);
	}

	/// Drop every storage slot of `address`, including the durable ones.
	pub fn reset_storage<B: Backend>(&mut self, address: Address, backend: &B) {
		let current = self.current();
		self.substates[current]
			.storages
			.retain(|(a, _), _| *a != address);
		self.account_mut(address, backend).reset = true;
	}

	pub fn set_deleted(&mut self, address: Address) {
		let current = self.current();
		self.substates[current].deletes.insert(address);
	}

	pub fn set_code<B: Backend>(&mut self, address: Address, code: Vec<u8>, backend: &B) {
		self.account_mut(address, backend).code = Some(code);
	}

	pub fn deposit<B: Backend>(&mut self, address: Address, value: Word, backend: &B) {
		let account = self.account_mut(address, backend);
		account.basic.balance = account.basic.balance.saturating_add(value);
	}

	pub fn withdraw<B: Backend>(
		&mut self,
		address: Address,
		value: Word,
		backend: &B,
	) -> Result<(), ExitError> {
		let account = self.account_mut(address, backend);
		account.basic.balance = account
			.basic
			.balance
			.checked_sub(value)
			.ok_or(ExitError::InsufficientBalance)?;
		Ok(())
	}

	pub fn transfer<B: Backend>(
		&mut self,
		source: Address,
		target: Address,
		value: Word,
		backend: &B,
	) -> Result<(), ExitError> {
		self.withdraw(source, value, backend)?;
		self.deposit(target, value, backend);
		Ok(())
	}

	pub fn reset_balance<B: Backend>(&mut self, address: Address, backend: &B) {
		self.account_mut(address, backend).basic.balance = Word::ZERO;
	}

	/// Turn the transaction substate into backend operations, plus the list
	/// of deleted accounts.
	pub fn deconstruct<B: Backend>(
		mut self,
		backend: &B,
	) -> Result<(Vec<Apply<BTreeMap<Word, Word>>>, Vec<Address>), ExitFatal> {
		if self.substates.len() != 1 {
			return Err(ExitFatal::Other("frames still entered at commit"));
		}
		let root = self
			.substates
			.pop()
			.ok_or(ExitFatal::Other("missing transaction substate"))?;

		let mut storages: BTreeMap<Address, BTreeMap<Word, Word>> = BTreeMap::new();
		for ((address, key), value) in root.storages {
			storages.entry(address).or_default().insert(key, value);
		}

		let addresses: BTreeSet<Address> = root
			.accounts
			.keys()
			.chain(storages.keys())
			.copied()
			.collect();

		let mut applies = Vec::new();
		for address in addresses {
			if root.deletes.contains(&address) {
				continue;
			}

			let account = root.accounts.get(&address);
			applies.push(Apply::Modify {
				address,
				basic: account
					.map(|account| account.basic.clone())
					.unwrap_or_else(|| backend.basic(address)),
				code: account.and_then(|account| account.code.clone()),
				storage: storages.remove(&address).unwrap_or_default(),
				reset_storage: account.map_or(false, |account| account.reset),
			});
		}

		let deleted: Vec<Address> = root.deletes.into_iter().collect();
		for address in &deleted {
			applies.push(Apply::Delete { address: *address });
		}

		Ok((applies, deleted))
	}
}
