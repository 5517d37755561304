use crate::backend::Log;
use crate::result::{ExecutionResult, InternalTransaction, ResultCode};
use crate::{Address, Bloom, Config, Word};
use alloc::vec::Vec;
use primitive_types::{H256, U256};
use sha3::{Digest, Keccak256};

/// A signed top-level transaction, already recovered to its sender.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
	feature = "with-codec",
	derive(codec::Encode, codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
	pub nonce: U256,
	pub from: Address,
	/// `None` for a contract creation.
	pub to: Option<Address>,
	pub value: Word,
	/// Call data, or the init code of a creation.
	pub data: Vec<u8>,
	pub nrg_limit: u64,
	pub nrg_price: Word,
}

impl Transaction {
	pub fn is_contract_creation(&self) -> bool {
		self.to.is_none()
	}

	/// Keccak-256 of the RLP list
	/// `[nonce, to, value, data, nrg_limit, nrg_price, from]`.
	pub fn hash(&self) -> H256 {
		let mut stream = rlp::RlpStream::new_list(7);
		stream.append(&self.nonce);
		match &self.to {
			Some(to) => stream.append(to),
			None => stream.append_empty_data(),
		};
		stream.append(&U256::from(self.value));
		stream.append(&self.data);
		stream.append(&self.nrg_limit);
		stream.append(&U256::from(self.nrg_price));
		stream.append(&self.from);
		H256::from_slice(Keccak256::digest(&stream.out()).as_slice())
	}

	/// Address a creation deploys to.
	pub fn contract_address(&self, config: &Config) -> Option<Address> {
		if self.is_contract_creation() {
			Some(create_address(self.from, self.nonce, config))
		} else {
			None
		}
	}
}

/// Address of the contract created by `caller` at `nonce`: Keccak-256 of
/// `rlp([caller, nonce])` with the first byte replaced by the configured
/// prefix.
pub fn create_address(caller: Address, nonce: U256, config: &Config) -> Address {
	let mut stream = rlp::RlpStream::new_list(2);
	stream.append(&caller);
	stream.append(&nonce);
	let mut address = H256::from_slice(Keccak256::digest(&stream.out()).as_slice());
	address.as_bytes_mut()[0] = config.contract_address_prefix;
	address
}

/// Receipt of an executed transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Receipt {
	pub transaction_hash: H256,
	pub status: ResultCode,
	/// Energy consumed net of refunds.
	pub nrg_used: u64,
	pub output: Vec<u8>,
	/// Logs in emission order.
	pub logs: Vec<Log>,
	pub bloom: Bloom,
}

/// Everything a transaction produced.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransactionSummary {
	pub receipt: Receipt,
	/// Top-level frame outcome. Its logs and internal transactions are moved
	/// to `receipt` and `internal_transactions`.
	pub result: ExecutionResult,
	/// Amount credited back to the sender.
	pub refund: Word,
	/// Amount credited to the block coinbase.
	pub fee: Word,
	pub contract_address: Option<Address>,
	pub internal_transactions: Vec<InternalTransaction>,
	pub deleted_accounts: Vec<Address>,
}

impl TransactionSummary {
	pub fn status(&self) -> ResultCode {
		self.receipt.status
	}

	pub fn nrg_used(&self) -> u64 {
		self.receipt.nrg_used
	}

	pub fn logs(&self) -> &[Log] {
		&self.receipt.logs
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn transaction(to: Option<Address>) -> Transaction {
		Transaction {
			nonce: U256::from(3),
			from: Address::repeat_byte(0xa0),
			to,
			value: Word::from(10u32),
			data: vec![1, 2, 3],
			nrg_limit: 100_000,
			nrg_price: Word::from(10_000_000_000u64),
		}
	}

	#[test]
	fn contract_address_carries_prefix() {
		let config = Config::aion();
		let tx = transaction(None);
		let address = tx.contract_address(&config).unwrap();

		assert_eq!(address.as_bytes()[0], 0xa0);
		assert_eq!(address, create_address(tx.from, tx.nonce, &config));
		assert_ne!(address, create_address(tx.from, U256::from(4), &config));
		assert_eq!(transaction(Some(Address::zero())).contract_address(&config), None);
	}

	#[test]
	fn hash_covers_every_field() {
		let base = transaction(Some(Address::repeat_byte(1)));
		let hash = base.hash();
		assert_eq!(hash, base.clone().hash());

		let mut other = base.clone();
		other.value = Word::from(11u32);
		assert_ne!(other.hash(), hash);

		let mut other = base.clone();
		other.nrg_limit += 1;
		assert_ne!(other.hash(), hash);

		let mut other = base;
		other.to = None;
		assert_ne!(other.hash(), hash);
	}
}
