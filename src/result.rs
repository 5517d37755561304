use crate::backend::Log;
use crate::context::CallKind;
use crate::{Address, ExitError, Word};
use alloc::vec::Vec;
use core::fmt;
use primitive_types::{H256, U256};

/// Why a transaction was refused before anything ran.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
	feature = "with-codec",
	derive(codec::Encode, codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransactionRejection {
	/// Transaction nonce differs from the sender's account nonce.
	InvalidNonce,
	/// Declared energy limit does not cover the intrinsic cost.
	IntrinsicNrgTooLow,
	/// Declared energy limit is above the block energy limit.
	NrgLimitExceedsBlock,
	/// Sender cannot pay for `nrg_limit * nrg_price + value`.
	InsufficientBalance,
}

/// Terminal outcome of a frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
	feature = "with-codec",
	derive(codec::Encode, codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResultCode {
	Success,
	/// Explicit revert.
	Failure,
	OutOfEnergy,
	BadInstruction,
	BadJumpDestination,
	StackOverflow,
	StackUnderflow,
	StaticModeError,
	InsufficientBalance,
	CallDepthLimitExceeded,
	ContractAlreadyExists,
	/// Only ever produced for the top-level frame.
	InvalidTransaction(TransactionRejection),
}

impl ResultCode {
	pub fn is_success(&self) -> bool {
		matches!(self, ResultCode::Success)
	}

	/// Whether the frame kept its unused energy.
	pub fn is_revert(&self) -> bool {
		matches!(self, ResultCode::Failure)
	}

	pub fn is_rejected(&self) -> bool {
		matches!(self, ResultCode::InvalidTransaction(_))
	}
}

impl From<ExitError> for ResultCode {
	fn from(error: ExitError) -> Self {
		match error {
			ExitError::OutOfEnergy => ResultCode::OutOfEnergy,
			ExitError::BadInstruction => ResultCode::BadInstruction,
			ExitError::BadJumpDestination => ResultCode::BadJumpDestination,
			ExitError::StackOverflow => ResultCode::StackOverflow,
			ExitError::StackUnderflow => ResultCode::StackUnderflow,
			ExitError::StaticModeError => ResultCode::StaticModeError,
			ExitError::InsufficientBalance => ResultCode::InsufficientBalance,
			ExitError::CallDepthLimitExceeded => ResultCode::CallDepthLimitExceeded,
			ExitError::ContractAlreadyExists => ResultCode::ContractAlreadyExists,
		}
	}
}

impl From<TransactionRejection> for ResultCode {
	fn from(rejection: TransactionRejection) -> Self {
		ResultCode::InvalidTransaction(rejection)
	}
}

impl fmt::Display for ResultCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResultCode::Success => write!(f, "SUCCESS"),
			ResultCode::Failure => write!(f, "FAILURE"),
			ResultCode::OutOfEnergy => write!(f, "OUT_OF_ENERGY"),
			ResultCode::BadInstruction => write!(f, "BAD_INSTRUCTION"),
			ResultCode::BadJumpDestination => write!(f, "BAD_JUMP_DESTINATION"),
			ResultCode::StackOverflow => write!(f, "STACK_OVERFLOW"),
			ResultCode::StackUnderflow => write!(f, "STACK_UNDERFLOW"),
			ResultCode::StaticModeError => write!(f, "STATIC_MODE_ERROR"),
			ResultCode::InsufficientBalance => write!(f, "INSUFFICIENT_BALANCE"),
			ResultCode::CallDepthLimitExceeded => write!(f, "CALL_DEPTH_LIMIT_EXCEEDED"),
			ResultCode::ContractAlreadyExists => write!(f, "CONTRACT_ALREADY_EXISTS"),
			ResultCode::InvalidTransaction(reason) => write!(f, "INVALID_TRANSACTION({:?})", reason),
		}
	}
}

/// Record of a nested call or create.
///
/// Kept even when the frame or one of its ancestors fails; `rejected` then
/// holds the outcome that discarded it.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InternalTransaction {
	/// Hash of the top-level transaction.
	pub parent_hash: H256,
	/// Depth of the frame that was requested.
	pub depth: u32,
	/// Position in depth-first order, starting at zero.
	pub index: u32,
	/// Nonce of `from` when the request was made.
	pub nonce: U256,
	pub kind: CallKind,
	pub from: Address,
	/// Callee, or the derived contract address for a create.
	pub to: Address,
	pub value: Word,
	pub data: Vec<u8>,
	pub nrg_limit: u64,
	pub rejected: Option<ResultCode>,
}

impl InternalTransaction {
	pub fn is_rejected(&self) -> bool {
		self.rejected.is_some()
	}

	/// Mark as rejected unless an earlier, more specific reason is recorded.
	pub fn reject(&mut self, code: ResultCode) {
		if self.rejected.is_none() {
			self.rejected = Some(code);
		}
	}
}

/// Outcome of one call frame.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionResult {
	pub code: ResultCode,
	/// Energy handed back to the caller.
	pub nrg_left: u64,
	pub output: Vec<u8>,
	/// Address of the contract created by a successful create frame.
	pub contract_address: Option<Address>,
	/// Logs of this frame and its committed children, in emission order.
	pub logs: Vec<Log>,
	/// Internal transactions requested by this frame and its children.
	pub internal_transactions: Vec<InternalTransaction>,
}

impl ExecutionResult {
	pub fn new(code: ResultCode, nrg_left: u64, output: Vec<u8>) -> Self {
		Self {
			code,
			nrg_left,
			output,
			contract_address: None,
			logs: Vec::new(),
			internal_transactions: Vec::new(),
		}
	}

	/// Result of a frame that failed before the interpreter ran.
	pub fn rejected(error: ExitError) -> Self {
		Self::new(error.into(), 0, Vec::new())
	}
}
