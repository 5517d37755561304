//! Scripted interpreter and account fixtures for executor tests.
//!
//! Contract code is a flat list of test instructions. Nothing is charged
//! except through `BURN`, so energy figures in tests are exact.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::rc::Rc;

use fastvm::backend::{MemoryAccount, MemoryBackend};
use fastvm::{
	Address, BlockEnv, CallKind, CallRequest, Capture, ExecutionContext, ExecutionResult,
	ExitError, ExitReason, Handler, Interpreter, Machine, ResultCode, Transaction, Word,
};
use primitive_types::{H256, U256};

pub const LOG: u8 = 0x01;
pub const SSTORE: u8 = 0x02;
pub const CALL: u8 = 0x03;
pub const CREATE: u8 = 0x04;
pub const RETURN: u8 = 0x05;
pub const REVERT: u8 = 0x06;
pub const BURN: u8 = 0x07;
pub const INVALID: u8 = 0x08;
pub const RECURSE: u8 = 0x09;
pub const STORE_RESULT: u8 = 0x0a;
pub const SSTORE_DEPTH: u8 = 0x0b;
pub const REFUND: u8 = 0x0c;
pub const SELFDESTRUCT: u8 = 0x0d;
pub const REQUIRE: u8 = 0x0e;
pub const FORWARD: u8 = 0x0f;

/// Builder for test scripts.
#[derive(Default, Clone, Debug)]
pub struct Script(Vec<u8>);

impl Script {
	pub fn new() -> Self {
		Self::default()
	}

	/// Emit a log with one topic made of `seed` bytes.
	pub fn log(mut self, seed: u8) -> Self {
		self.0.extend_from_slice(&[LOG, seed]);
		self
	}

	pub fn sstore(mut self, key: u8, value: u8) -> Self {
		self.0.extend_from_slice(&[SSTORE, key, value]);
		self
	}

	/// Store the current depth as a key.
	pub fn sstore_depth(mut self) -> Self {
		self.0.push(SSTORE_DEPTH);
		self
	}

	pub fn call(self, address: Address, gas: u64, value: u8) -> Self {
		self.call_kind(CallKind::Call, false, address, gas, value)
	}

	pub fn static_call(self, address: Address, gas: u64) -> Self {
		self.call_kind(CallKind::Call, true, address, gas, 0)
	}

	pub fn call_kind(
		mut self,
		kind: CallKind,
		is_static: bool,
		address: Address,
		gas: u64,
		value: u8,
	) -> Self {
		self.0.push(CALL);
		self.0.push(kind.as_u32() as u8);
		self.0.push(is_static as u8);
		self.0.extend_from_slice(address.as_bytes());
		self.0.extend_from_slice(&gas.to_be_bytes());
		self.0.push(value);
		self
	}

	pub fn create(mut self, gas: u64, value: u8, init_code: &[u8]) -> Self {
		self.0.push(CREATE);
		self.0.extend_from_slice(&gas.to_be_bytes());
		self.0.push(value);
		self.0.extend_from_slice(&(init_code.len() as u16).to_be_bytes());
		self.0.extend_from_slice(init_code);
		self
	}

	pub fn ret(mut self, data: &[u8]) -> Self {
		self.0.push(RETURN);
		self.0.extend_from_slice(&(data.len() as u16).to_be_bytes());
		self.0.extend_from_slice(data);
		self
	}

	pub fn revert(mut self) -> Self {
		self.0.push(REVERT);
		self
	}

	pub fn burn(mut self, amount: u64) -> Self {
		self.0.push(BURN);
		self.0.extend_from_slice(&amount.to_be_bytes());
		self
	}

	pub fn invalid(mut self) -> Self {
		self.0.push(INVALID);
		self
	}

	/// Call the running contract again until `target` depth is reached.
	pub fn recurse(mut self, target: u8) -> Self {
		self.0.extend_from_slice(&[RECURSE, target]);
		self
	}

	/// Store the tag of the last child result under `key`.
	pub fn store_result(mut self, key: u8) -> Self {
		self.0.extend_from_slice(&[STORE_RESULT, key]);
		self
	}

	pub fn refund(mut self, amount: u64) -> Self {
		self.0.push(REFUND);
		self.0.extend_from_slice(&amount.to_be_bytes());
		self
	}

	pub fn selfdestruct(mut self, target: Address) -> Self {
		self.0.push(SELFDESTRUCT);
		self.0.extend_from_slice(target.as_bytes());
		self
	}

	/// Revert unless the last child succeeded.
	pub fn require(mut self) -> Self {
		self.0.push(REQUIRE);
		self
	}

	/// Call the address in call data bytes `0..32` with the energy in bytes
	/// `32..40`.
	pub fn forward(mut self) -> Self {
		self.0.push(FORWARD);
		self
	}

	pub fn build(self) -> Vec<u8> {
		self.0
	}
}

/// Call data understood by [`Script::forward`].
pub fn forward_data(address: Address, gas: u64) -> Vec<u8> {
	let mut data = address.as_bytes().to_vec();
	data.extend_from_slice(&gas.to_be_bytes());
	data
}

/// Numeric tag stored by [`Script::store_result`].
pub fn result_tag(code: ResultCode) -> u32 {
	match code {
		ResultCode::Success => 1,
		ResultCode::Failure => 2,
		ResultCode::OutOfEnergy => 3,
		ResultCode::CallDepthLimitExceeded => 4,
		ResultCode::StaticModeError => 5,
		ResultCode::InsufficientBalance => 6,
		ResultCode::ContractAlreadyExists => 7,
		_ => 8,
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MockInterpreter;

impl Interpreter for MockInterpreter {
	type Machine = MockMachine;

	fn instantiate(&self, code: Rc<Vec<u8>>, context: &ExecutionContext) -> MockMachine {
		MockMachine {
			code,
			position: 0,
			context: context.clone(),
			last_result: None,
			return_value: Vec::new(),
		}
	}
}

pub struct MockMachine {
	code: Rc<Vec<u8>>,
	position: usize,
	context: ExecutionContext,
	last_result: Option<ResultCode>,
	return_value: Vec<u8>,
}

impl MockMachine {
	fn take(&mut self, len: usize) -> Option<&[u8]> {
		let end = self.position.checked_add(len)?;
		let slice = self.code.get(self.position..end)?;
		self.position = end;
		Some(slice)
	}

	fn byte(&mut self) -> Option<u8> {
		self.take(1).map(|b| b[0])
	}

	fn u64(&mut self) -> Option<u64> {
		let mut bytes = [0u8; 8];
		bytes.copy_from_slice(self.take(8)?);
		Some(u64::from_be_bytes(bytes))
	}

	fn address(&mut self) -> Option<Address> {
		self.take(32).map(Address::from_slice)
	}

	fn step(
		&mut self,
		handler: &mut dyn Handler,
	) -> Option<Result<Option<CallRequest>, ExitReason>> {
		let recipient = self.context.recipient();
		let opcode = self.byte()?;
		let outcome = match opcode {
			LOG => {
				let seed = self.byte()?;
				handler
					.log(recipient, vec![H256::repeat_byte(seed)], vec![seed])
					.map(|_| None)
					.map_err(ExitReason::from)
			}
			SSTORE => {
				let key = self.byte()?;
				let value = self.byte()?;
				handler
					.set_storage(recipient, Word::from(key as u32), Word::from(value as u32))
					.map(|_| None)
					.map_err(ExitReason::from)
			}
			SSTORE_DEPTH => handler
				.set_storage(recipient, Word::from(self.context.depth()), Word::ONE)
				.map(|_| None)
				.map_err(ExitReason::from),
			CALL => {
				let kind = CallKind::try_from(self.byte()? as u32).ok()?;
				let is_static = self.byte()? != 0;
				let address = self.address()?;
				let nrg_limit = self.u64()?;
				let value = Word::from(self.byte()? as u32);
				Ok(Some(CallRequest {
					kind,
					address,
					value,
					data: Vec::new(),
					nrg_limit,
					is_static,
				}))
			}
			CREATE => {
				let nrg_limit = self.u64()?;
				let value = Word::from(self.byte()? as u32);
				let len = u16::from_be_bytes([self.byte()?, self.byte()?]) as usize;
				let init_code = self.take(len)?.to_vec();
				Ok(Some(CallRequest {
					kind: CallKind::Create,
					address: Address::zero(),
					value,
					data: init_code,
					nrg_limit,
					is_static: false,
				}))
			}
			RETURN => {
				let len = u16::from_be_bytes([self.byte()?, self.byte()?]) as usize;
				self.return_value = self.take(len)?.to_vec();
				Err(ExitReason::Succeed)
			}
			REVERT => Err(ExitReason::Revert),
			BURN => {
				let amount = self.u64()?;
				handler
					.record_cost(amount)
					.map(|_| None)
					.map_err(ExitReason::from)
			}
			INVALID => Err(ExitError::BadInstruction.into()),
			RECURSE => {
				let target = self.byte()? as u32;
				if self.context.depth() < target {
					Ok(Some(CallRequest {
						kind: CallKind::Call,
						address: recipient,
						value: Word::ZERO,
						data: Vec::new(),
						nrg_limit: u64::MAX,
						is_static: false,
					}))
				} else {
					Ok(None)
				}
			}
			STORE_RESULT => {
				let key = self.byte()?;
				let tag = self.last_result.map(result_tag).unwrap_or(0);
				handler
					.set_storage(recipient, Word::from(key as u32), Word::from(tag))
					.map(|_| None)
					.map_err(ExitReason::from)
			}
			REFUND => {
				let amount = self.u64()?;
				handler.record_refund(amount as i64);
				Ok(None)
			}
			SELFDESTRUCT => {
				let target = self.address()?;
				handler
					.mark_delete(recipient, target)
					.map(|_| None)
					.map_err(ExitReason::from)
			}
			REQUIRE => match self.last_result {
				Some(ResultCode::Success) => Ok(None),
				_ => Err(ExitReason::Revert),
			},
			FORWARD => {
				let data = self.context.call_data();
				if data.len() < 40 {
					return Some(Err(ExitError::BadInstruction.into()));
				}
				let address = Address::from_slice(&data[..32]);
				let mut gas = [0u8; 8];
				gas.copy_from_slice(&data[32..40]);
				Ok(Some(CallRequest {
					kind: CallKind::Call,
					address,
					value: Word::ZERO,
					data: Vec::new(),
					nrg_limit: u64::from_be_bytes(gas),
					is_static: false,
				}))
			}
			_ => Err(ExitError::BadInstruction.into()),
		};
		Some(outcome)
	}
}

impl Machine for MockMachine {
	fn run(&mut self, handler: &mut dyn Handler) -> Capture<ExitReason, CallRequest> {
		loop {
			if self.position >= self.code.len() {
				return Capture::Exit(ExitReason::Succeed);
			}
			match self.step(handler) {
				None => return Capture::Exit(ExitError::BadInstruction.into()),
				Some(Err(reason)) => return Capture::Exit(reason),
				Some(Ok(Some(request))) => return Capture::Trap(request),
				Some(Ok(None)) => (),
			}
		}
	}

	fn return_value(&self) -> Vec<u8> {
		self.return_value.clone()
	}

	fn finish_call(&mut self, result: &ExecutionResult) {
		self.last_result = Some(result.code);
	}
}

pub fn sender() -> Address {
	Address::repeat_byte(0xa1)
}

pub fn coinbase() -> Address {
	Address::repeat_byte(0xc0)
}

pub fn block() -> BlockEnv {
	BlockEnv {
		coinbase: coinbase(),
		number: 1,
		timestamp: 1_600_000_000,
		nrg_limit: 15_000_000,
		difficulty: Word::from(16u32),
	}
}

pub fn account(balance: u64) -> MemoryAccount {
	MemoryAccount {
		balance: Word::from(balance),
		..Default::default()
	}
}

pub fn contract(code: Vec<u8>) -> MemoryAccount {
	MemoryAccount {
		code,
		..Default::default()
	}
}

/// Backend holding a funded sender plus the given accounts.
pub fn backend(accounts: Vec<(Address, MemoryAccount)>) -> MemoryBackend {
	let mut state = BTreeMap::new();
	state.insert(sender(), account(10_000_000));
	for (address, account) in accounts {
		state.insert(address, account);
	}
	MemoryBackend::new(state)
}

pub fn call_tx(to: Address, data: Vec<u8>, nrg_limit: u64) -> Transaction {
	Transaction {
		nonce: U256::zero(),
		from: sender(),
		to: Some(to),
		value: Word::ZERO,
		data,
		nrg_limit,
		nrg_price: Word::ONE,
	}
}

pub fn create_tx(init_code: Vec<u8>, nrg_limit: u64) -> Transaction {
	Transaction {
		nonce: U256::zero(),
		from: sender(),
		to: None,
		value: Word::ZERO,
		data: init_code,
		nrg_limit,
		nrg_price: Word::ONE,
	}
}
