//! Transaction executor of the Aion FastVM.
//!
//! Drives one transaction through its nested call and create frames on top
//! of an external bytecode [`Interpreter`](interpreter::Interpreter) and an
//! account [`Backend`](backend::Backend), metering energy, rolling back
//! failed frames and assembling the receipt with its log bloom.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use fastvm_core::*;
pub use fastvm_gasometer as gasometer;
pub use fastvm_gasometer::Config;

#[cfg(feature = "tracing")]
pub mod tracing;

#[cfg(feature = "tracing")]
macro_rules! event {
	($x:expr) => {{
		use crate::tracing::Event::*;
		crate::tracing::with(|listener| listener.event($x));
	}};
}

#[cfg(not(feature = "tracing"))]
macro_rules! event {
	($x:expr) => {};
}

pub mod backend;
pub mod context;
pub mod executor;
pub mod interpreter;
pub mod result;
pub mod transaction;

pub use crate::backend::{logs_bloom, Log};
pub use crate::context::{BlockEnv, CallKind, ContextError, ExecutionContext, STATIC_FLAG};
pub use crate::executor::{Stage, TransactionExecutor};
pub use crate::interpreter::{CallRequest, Handler, Interpreter, Machine};
pub use crate::result::{ExecutionResult, InternalTransaction, ResultCode, TransactionRejection};
pub use crate::transaction::{create_address, Receipt, Transaction, TransactionSummary};
