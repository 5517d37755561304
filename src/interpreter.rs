//! Boundary between the executor and a bytecode interpreter.
//!
//! The executor owns every call frame. An interpreter only turns code and a
//! context into a [`Machine`]; the machine runs until it either exits or
//! traps with a [`CallRequest`], and is resumed through
//! [`Machine::finish_call`] once the executor has run the nested frame.

use crate::context::{CallKind, ExecutionContext};
use crate::result::ExecutionResult;
use crate::{Address, Capture, ExitError, ExitReason, Word};
use alloc::rc::Rc;
use alloc::vec::Vec;
use primitive_types::{H256, U256};

/// Nested call or create requested by running code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallRequest {
	pub kind: CallKind,
	/// Callee, or the account whose code is borrowed. Ignored for creates.
	pub address: Address,
	pub value: Word,
	/// Call data, or the init code of a create.
	pub data: Vec<u8>,
	/// Energy offered to the child; capped by what the caller has left.
	pub nrg_limit: u64,
	/// Run the child read-only.
	pub is_static: bool,
}

/// State access available to a running frame.
#[auto_impl::auto_impl(&mut, Box)]
pub trait Handler {
	/// Get balance of address.
	fn balance(&self, address: Address) -> Word;
	/// Get nonce of address.
	fn nonce(&self, address: Address) -> U256;
	/// Get code of address.
	fn code(&self, address: Address) -> Vec<u8>;
	/// Get code size of address.
	fn code_size(&self, address: Address) -> usize {
		self.code(address).len()
	}
	/// Get storage value of address at key.
	fn storage(&self, address: Address, key: Word) -> Word;
	/// Check whether an address exists.
	fn exists(&self, address: Address) -> bool;
	/// Whether the address was marked for deletion earlier in the transaction.
	fn deleted(&self, address: Address) -> bool;

	/// Energy left in the current frame.
	fn gas_left(&self) -> u64;
	/// Charge the current frame.
	fn record_cost(&mut self, cost: u64) -> Result<(), ExitError>;
	/// Add to (or, when negative, take from) the refund counter.
	fn record_refund(&mut self, refund: i64);

	/// Set storage value of address at key.
	fn set_storage(&mut self, address: Address, key: Word, value: Word) -> Result<(), ExitError>;
	/// Create a log owned by address with given topics and data.
	fn log(&mut self, address: Address, topics: Vec<H256>, data: Vec<u8>) -> Result<(), ExitError>;
	/// Move the balance of address to target and delete it at commit.
	fn mark_delete(&mut self, address: Address, target: Address) -> Result<(), ExitError>;
}

/// A frame in execution.
pub trait Machine {
	/// Run until exit or until a nested frame is needed.
	fn run(&mut self, handler: &mut dyn Handler) -> Capture<ExitReason, CallRequest>;
	/// Bytes returned by the frame. Only read after `run` exited.
	fn return_value(&self) -> Vec<u8>;
	/// Feed the outcome of the last requested frame back in.
	fn finish_call(&mut self, result: &ExecutionResult);
}

/// Factory of machines.
#[auto_impl::auto_impl(&, Box, Rc)]
pub trait Interpreter {
	type Machine: Machine;

	fn instantiate(&self, code: Rc<Vec<u8>>, context: &ExecutionContext) -> Self::Machine;
}
