//! Allows to listen to executor events.

use crate::context::ExecutionContext;
use crate::result::TransactionRejection;
use crate::{Address, ExitReason, Word};
use primitive_types::H256;

environmental::environmental!(listener: dyn EventListener + 'static);

pub trait EventListener {
	fn event(&mut self, event: Event);
}

#[derive(Debug, Copy, Clone)]
pub enum Event<'a> {
	TransactCall {
		caller: Address,
		address: Address,
		value: Word,
		data: &'a [u8],
		nrg_limit: u64,
	},
	TransactCreate {
		caller: Address,
		address: Address,
		value: Word,
		init_code: &'a [u8],
		nrg_limit: u64,
	},
	Reject {
		transaction_hash: H256,
		reason: TransactionRejection,
	},
	Call {
		code_address: Address,
		context: &'a ExecutionContext,
	},
	Create {
		caller: Address,
		address: Address,
		value: Word,
		init_code: &'a [u8],
		nrg_limit: u64,
	},
	MarkDelete {
		address: Address,
		target: Address,
		balance: Word,
	},
	Exit {
		reason: &'a ExitReason,
		return_value: &'a [u8],
	},
}

/// Run closure with provided listener.
pub fn using<R, F: FnOnce() -> R>(new: &mut (dyn EventListener + 'static), f: F) -> R {
	listener::using(new, f)
}

pub(crate) fn with<F: FnOnce(&mut (dyn EventListener + 'static))>(f: F) {
	listener::with(f);
}
