mod executor;
mod state;

pub use self::executor::{Stage, TransactionExecutor};
pub use self::state::TrackedState;

use crate::gasometer::Gasometer;
use crate::Config;

/// How a substate is folded back into its parent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StackExitKind {
	/// Keep state, unused energy and refunds.
	Succeeded,
	/// Drop state, give back unused energy.
	Reverted,
	/// Drop state and energy.
	Failed,
}

/// Per-substate bookkeeping kept alongside the tracked changes.
#[derive(Clone, Debug)]
pub struct StackSubstateMetadata<'config> {
	gasometer: Gasometer<'config>,
	is_static: bool,
	depth: Option<usize>,
}

impl<'config> StackSubstateMetadata<'config> {
	pub fn new(gas_limit: u64, config: &'config Config) -> Self {
		Self {
			gasometer: Gasometer::new(gas_limit, config),
			is_static: false,
			depth: None,
		}
	}

	pub fn swallow_commit(&mut self, other: Self) {
		self.gasometer.record_stipend(other.gasometer.gas());
		self.gasometer.record_refund(other.gasometer.refunded_gas());
	}

	pub fn swallow_revert(&mut self, other: Self) {
		self.gasometer.record_stipend(other.gasometer.gas());
	}

	pub fn swallow_discard(&mut self, _other: Self) {}

	pub fn spit_child(&self, gas_limit: u64, is_static: bool) -> Self {
		Self {
			gasometer: Gasometer::new(gas_limit, self.gasometer.config()),
			is_static: is_static || self.is_static,
			depth: match self.depth {
				None => Some(0),
				Some(n) => Some(n + 1),
			},
		}
	}

	pub fn gasometer(&self) -> &Gasometer<'config> {
		&self.gasometer
	}

	pub fn gasometer_mut(&mut self) -> &mut Gasometer<'config> {
		&mut self.gasometer
	}

	pub fn is_static(&self) -> bool {
		self.is_static
	}

	/// Depth of the frame owning this substate, `None` for the transaction
	/// level.
	pub fn depth(&self) -> Option<usize> {
		self.depth
	}
}
