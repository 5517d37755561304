//! Energy metering for FastVM call frames.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

mod consts;
mod costs;

pub use crate::consts::*;
pub use crate::costs::{transaction_cost, TransactionCost};

use fastvm_core::ExitError;

#[cfg(feature = "force-debug")]
macro_rules! log_gas {
	($self:expr, $($arg:tt)*) => (
		log::trace!(target: "fastvm", "Gasometer {} [Gas used: {}, Gas left: {}]",
			format_args!($($arg)*), $self.used_gas, $self.gas());
	);
}

#[cfg(not(feature = "force-debug"))]
macro_rules! log_gas {
	($self:expr, $($arg:tt)*) => {};
}

/// Protocol parameters of the energy model.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
	/// Energy paid by every transaction.
	pub nrg_transaction: u64,
	/// Extra energy paid by a contract creation transaction.
	pub nrg_tx_create: u64,
	/// Energy paid per zero byte of transaction data.
	pub nrg_tx_data_zero: u64,
	/// Energy paid per non-zero byte of transaction data.
	pub nrg_tx_data_nonzero: u64,
	/// Energy paid per byte of deployed code.
	pub nrg_code_deposit: u64,
	/// Refund credited when a storage slot is cleared.
	pub nrg_sstore_clear_refund: u64,
	/// Maximum depth of nested calls.
	pub max_call_depth: usize,
	/// Refunds are capped at `used / max_refund_quotient`.
	pub max_refund_quotient: u64,
	/// Leading byte of every derived contract address.
	pub contract_address_prefix: u8,
}

impl Config {
	/// Parameters of the Aion mainnet.
	pub const fn aion() -> Config {
		Config {
			nrg_transaction: NRG_TRANSACTION,
			nrg_tx_create: NRG_TX_CREATE,
			nrg_tx_data_zero: NRG_TX_DATA_ZERO,
			nrg_tx_data_nonzero: NRG_TX_DATA_NONZERO,
			nrg_code_deposit: NRG_CODE_DEPOSIT,
			nrg_sstore_clear_refund: NRG_SSTORE_CLEAR_REFUND,
			max_call_depth: MAX_CALL_DEPTH,
			max_refund_quotient: MAX_REFUND_QUOTIENT,
			contract_address_prefix: 0xa0,
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self::aion()
	}
}

/// Energy bookkeeping of a single call frame.
#[derive(Clone, Debug)]
pub struct Gasometer<'config> {
	gas_limit: u64,
	used_gas: u64,
	refunded_gas: i64,
	config: &'config Config,
}

impl<'config> Gasometer<'config> {
	pub fn new(gas_limit: u64, config: &'config Config) -> Self {
		Self {
			gas_limit,
			used_gas: 0,
			refunded_gas: 0,
			config,
		}
	}

	pub fn config(&self) -> &'config Config {
		self.config
	}

	pub fn gas_limit(&self) -> u64 {
		self.gas_limit
	}

	/// Remaining energy.
	pub fn gas(&self) -> u64 {
		self.gas_limit - self.used_gas
	}

	pub fn total_used_gas(&self) -> u64 {
		self.used_gas
	}

	pub fn refunded_gas(&self) -> i64 {
		self.refunded_gas
	}

	/// Consume everything that is left.
	pub fn fail(&mut self) {
		self.used_gas = self.gas_limit;
		self.refunded_gas = 0;
	}

	/// Record an explicit cost.
	pub fn record_cost(&mut self, cost: u64) -> Result<(), ExitError> {
		log_gas!(self, "Record cost {}", cost);

		match self.used_gas.checked_add(cost) {
			Some(all_gas_cost) if all_gas_cost <= self.gas_limit => {
				self.used_gas = all_gas_cost;
				Ok(())
			}
			_ => {
				self.fail();
				Err(ExitError::OutOfEnergy)
			}
		}
	}

	/// Record the intrinsic cost of a transaction.
	pub fn record_transaction(&mut self, cost: TransactionCost) -> Result<(), ExitError> {
		let cost = cost.cost(self.config);
		log_gas!(self, "Record transaction {}", cost);
		self.record_cost(cost)
	}

	/// Charge the code deposit of a freshly created contract.
	pub fn record_deposit(&mut self, len: usize) -> Result<(), ExitError> {
		let cost = (len as u64).saturating_mul(self.config.nrg_code_deposit);
		self.record_cost(cost)
	}

	pub fn record_refund(&mut self, refund: i64) {
		log_gas!(self, "Record refund {}", refund);
		self.refunded_gas = self.refunded_gas.saturating_add(refund);
	}

	/// Give back energy a child frame did not use.
	pub fn record_stipend(&mut self, stipend: u64) {
		log_gas!(self, "Record stipend {}", stipend);
		debug_assert!(stipend <= self.used_gas);
		self.used_gas = self.used_gas.saturating_sub(stipend);
	}

	/// Energy used net of the capped refund.
	pub fn used_gas_after_refund(&self) -> u64 {
		self.used_gas - self.effective_refund()
	}

	/// Refund credit actually honoured, capped at
	/// `used / max_refund_quotient`.
	pub fn effective_refund(&self) -> u64 {
		let cap = self.used_gas / self.config.max_refund_quotient;
		if self.refunded_gas <= 0 {
			0
		} else {
			core::cmp::min(cap, self.refunded_gas as u64)
		}
	}
}
