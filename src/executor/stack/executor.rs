use super::{StackSubstateMetadata, TrackedState};
use crate::backend::{logs_bloom, ApplyBackend, Backend, Log};
use crate::context::{BlockEnv, CallKind, ExecutionContext, STATIC_FLAG};
use crate::gasometer::TransactionCost;
use crate::interpreter::{CallRequest, Handler, Interpreter, Machine};
use crate::result::{ExecutionResult, InternalTransaction, ResultCode, TransactionRejection};
use crate::transaction::{create_address, Receipt, Transaction, TransactionSummary};
use crate::{Address, Capture, Config, ExitError, ExitFatal, ExitReason, Word};
use alloc::{rc::Rc, vec::Vec};
use core::cmp::min;
use core::mem;
use primitive_types::{H256, U256};

macro_rules! emit_exit {
	($reason:expr, $return_value:expr) => {{
		let reason = $reason;
		let return_value = $return_value;
		event!(Exit {
			reason: &reason,
			return_value: &return_value,
		});
		(reason, return_value)
	}};
}

const DEFAULT_CALL_STACK_CAPACITY: usize = 4;

/// Position of a [`TransactionExecutor`] in its life cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
	/// Nothing charged yet.
	Init,
	/// Nonce bumped and the energy limit paid for up front.
	FeeCharged,
	/// Frames are executing.
	Running,
	/// Top-level frame succeeded.
	Committed,
	/// Top-level frame failed; only nonce and fee survive.
	Reverted,
	/// Refund paid and state applied, or the transaction was rejected.
	Finalized,
}

/// Running call frame.
struct Frame<M> {
	machine: M,
	context: ExecutionContext,
	/// Address of the contract being created, for create frames.
	created: Option<Address>,
	logs: Vec<Log>,
	internal_transactions: Vec<InternalTransaction>,
}

/// Everything needed to open a frame on top of the current substate.
struct FrameEntry {
	context: ExecutionContext,
	/// Account the code was loaded from.
	code_address: Address,
	code: Vec<u8>,
	transfer: Option<(Address, Address)>,
	created: Option<Address>,
	nrg_limit: u64,
	record: Option<InternalTransaction>,
}

enum Spawn<M> {
	Frame(Frame<M>),
	/// The frame finished without running any code.
	Finished(ExecutionResult),
}

/// Executes a single transaction against a backend.
///
/// Call frames are kept on an explicit stack; each frame owns one substate
/// of the [`TrackedState`] arena. The backend is only written once the
/// transaction is finalized.
pub struct TransactionExecutor<'config, 'backend, B, I> {
	config: &'config Config,
	backend: &'backend mut B,
	interpreter: I,
	transaction: Transaction,
	transaction_hash: H256,
	block: BlockEnv,
	stage: Stage,
	next_index: u32,
}

impl<'config, 'backend, B, I> TransactionExecutor<'config, 'backend, B, I>
where
	B: Backend + ApplyBackend,
	I: Interpreter,
{
	pub fn new(
		config: &'config Config,
		backend: &'backend mut B,
		interpreter: I,
		transaction: Transaction,
		block: BlockEnv,
	) -> Self {
		let transaction_hash = transaction.hash();
		Self {
			config,
			backend,
			interpreter,
			transaction,
			transaction_hash,
			block,
			stage: Stage::Init,
			next_index: 0,
		}
	}

	pub fn config(&self) -> &'config Config {
		self.config
	}

	pub fn stage(&self) -> Stage {
		self.stage
	}

	pub fn transaction(&self) -> &Transaction {
		&self.transaction
	}

	pub fn transaction_hash(&self) -> H256 {
		self.transaction_hash
	}

	fn set_stage(&mut self, stage: Stage) {
		log::trace!(target: "fastvm", "Transaction {:?}: {:?} -> {:?}", self.transaction_hash, self.stage, stage);
		self.stage = stage;
	}

	/// Run the transaction to completion.
	///
	/// Every outcome of the transaction itself, rejection included, is an
	/// `Ok` summary. An `Err` means execution could not be carried out and
	/// the backend was left untouched.
	pub fn execute(&mut self) -> Result<TransactionSummary, ExitFatal> {
		if self.stage != Stage::Init {
			return Err(ExitFatal::Other("transaction already executed"));
		}

		let intrinsic = if self.transaction.is_contract_creation() {
			TransactionCost::create(&self.transaction.data)
		} else {
			TransactionCost::call(&self.transaction.data)
		};
		if let Err(reason) = self.validate(intrinsic.cost(self.config)) {
			return Ok(self.reject(reason));
		}

		let sender = self.transaction.from;
		let prepaid = self.prepaid().ok_or(ExitFatal::Other("prepaid energy overflow"))?;
		let contract_address = self.transaction.contract_address(self.config);
		let mut state = TrackedState::new(StackSubstateMetadata::new(
			self.transaction.nrg_limit,
			self.config,
		));
		state
			.metadata_mut()
			.gasometer_mut()
			.record_transaction(intrinsic)
			.map_err(|_| ExitFatal::Other("intrinsic cost above validated limit"))?;
		state
			.withdraw(sender, prepaid, &*self.backend)
			.map_err(|_| ExitFatal::Other("prepaid energy above validated balance"))?;
		state.inc_nonce(sender, &*self.backend);
		self.set_stage(Stage::FeeCharged);

		match contract_address {
			Some(address) => {
				log::trace!(target: "fastvm", "Creating contract {:?} from {:?}", address, sender);
				event!(TransactCreate {
					caller: sender,
					address,
					value: self.transaction.value,
					init_code: &self.transaction.data,
					nrg_limit: self.transaction.nrg_limit,
				});
			}
			None => {
				log::trace!(target: "fastvm", "Calling {:?} from {:?}", self.transaction.to, sender);
				event!(TransactCall {
					caller: sender,
					address: self.transaction.to.unwrap_or_default(),
					value: self.transaction.value,
					data: &self.transaction.data,
					nrg_limit: self.transaction.nrg_limit,
				});
			}
		}

		self.set_stage(Stage::Running);
		let entry = self.root_entry(&state, contract_address)?;
		let spawned = self.enter_frame(&mut state, entry)?;
		let mut result = self.execute_with_call_stack(&mut state, spawned)?;

		if result.code.is_success() {
			self.set_stage(Stage::Committed);
		} else {
			self.set_stage(Stage::Reverted);
		}

		let gasometer = state.metadata().gasometer();
		let nrg_used = gasometer.used_gas_after_refund();
		let price = self.transaction.nrg_price;
		let refund = Word::from(self.transaction.nrg_limit - nrg_used)
			.checked_mul(price)
			.ok_or(ExitFatal::Other("refund overflow"))?;
		let fee = Word::from(nrg_used)
			.checked_mul(price)
			.ok_or(ExitFatal::Other("fee overflow"))?;
		state.deposit(sender, refund, &*self.backend);
		state.deposit(self.block.coinbase, fee, &*self.backend);

		let (applies, deleted_accounts) = state.deconstruct(&*self.backend)?;
		self.backend.apply(applies);

		log::debug!(
			target: "fastvm",
			"Transaction {:?} finished with {}: used {} of {}, refund {}",
			self.transaction_hash,
			result.code,
			nrg_used,
			self.transaction.nrg_limit,
			refund,
		);
		self.set_stage(Stage::Finalized);

		let logs = mem::take(&mut result.logs);
		let internal_transactions = mem::take(&mut result.internal_transactions);
		Ok(TransactionSummary {
			receipt: Receipt {
				transaction_hash: self.transaction_hash,
				status: result.code,
				nrg_used,
				output: result.output.clone(),
				bloom: logs_bloom(&logs),
				logs,
			},
			refund,
			fee,
			contract_address: result.contract_address,
			internal_transactions,
			deleted_accounts,
			result,
		})
	}

	/// `nrg_limit * nrg_price`.
	fn prepaid(&self) -> Option<Word> {
		Word::from(self.transaction.nrg_limit).checked_mul(self.transaction.nrg_price)
	}

	fn validate(&self, intrinsic: u64) -> Result<(), TransactionRejection> {
		let sender = self.backend.basic(self.transaction.from);

		if self.transaction.nonce != sender.nonce {
			return Err(TransactionRejection::InvalidNonce);
		}
		if self.transaction.nrg_limit < intrinsic {
			return Err(TransactionRejection::IntrinsicNrgTooLow);
		}
		if self.transaction.nrg_limit > self.block.nrg_limit {
			return Err(TransactionRejection::NrgLimitExceedsBlock);
		}
		let total = self
			.prepaid()
			.and_then(|prepaid| prepaid.checked_add(self.transaction.value));
		match total {
			Some(total) if total <= sender.balance => Ok(()),
			_ => Err(TransactionRejection::InsufficientBalance),
		}
	}

	fn reject(&mut self, reason: TransactionRejection) -> TransactionSummary {
		log::debug!(target: "fastvm", "Transaction {:?} rejected: {:?}", self.transaction_hash, reason);
		event!(Reject {
			transaction_hash: self.transaction_hash,
			reason,
		});
		self.set_stage(Stage::Finalized);

		let result = ExecutionResult::new(reason.into(), 0, Vec::new());
		TransactionSummary {
			receipt: Receipt {
				transaction_hash: self.transaction_hash,
				status: result.code,
				nrg_used: 0,
				output: Vec::new(),
				logs: Vec::new(),
				bloom: Default::default(),
			},
			result,
			refund: Word::ZERO,
			fee: Word::ZERO,
			contract_address: None,
			internal_transactions: Vec::new(),
			deleted_accounts: Vec::new(),
		}
	}

	fn root_entry(
		&self,
		state: &TrackedState<'config>,
		contract_address: Option<Address>,
	) -> Result<FrameEntry, ExitFatal> {
		let sender = self.transaction.from;
		let nrg_limit = state.metadata().gasometer().gas();
		let (context, code) = match (contract_address, self.transaction.to) {
			(Some(address), _) => {
				let mut context = self.context(
					sender,
					sender,
					Address::zero(),
					self.transaction.value,
					nrg_limit,
					Vec::new(),
					0,
					CallKind::Create,
					0,
				)?;
				context.set_recipient(address);
				(context, self.transaction.data.clone())
			}
			(None, Some(to)) => (
				self.context(
					sender,
					sender,
					to,
					self.transaction.value,
					nrg_limit,
					self.transaction.data.clone(),
					0,
					CallKind::Call,
					0,
				)?,
				state.code(to, &*self.backend),
			),
			(None, None) => return Err(ExitFatal::Other("call without recipient")),
		};

		Ok(FrameEntry {
			transfer: Some((sender, context.recipient())),
			code_address: context.recipient(),
			context,
			code,
			created: contract_address,
			nrg_limit,
			record: None,
		})
	}

	#[allow(clippy::too_many_arguments)]
	fn context(
		&self,
		origin: Address,
		caller: Address,
		recipient: Address,
		value: Word,
		nrg_limit: u64,
		call_data: Vec<u8>,
		depth: u32,
		kind: CallKind,
		flags: u32,
	) -> Result<ExecutionContext, ExitFatal> {
		ExecutionContext::new(
			self.transaction_hash.as_bytes(),
			recipient,
			origin,
			caller,
			self.transaction.nrg_price,
			nrg_limit,
			value,
			call_data,
			depth,
			kind,
			flags,
			self.block.clone(),
		)
		.map_err(|_| ExitFatal::Other("malformed execution context"))
	}

	/// Execute frames on the call stack until the first one returns.
	fn execute_with_call_stack(
		&mut self,
		state: &mut TrackedState<'config>,
		root: Spawn<I::Machine>,
	) -> Result<ExecutionResult, ExitFatal> {
		let mut call_stack = Vec::with_capacity(DEFAULT_CALL_STACK_CAPACITY);
		match root {
			Spawn::Frame(frame) => call_stack.push(frame),
			Spawn::Finished(result) => return Ok(result),
		}

		loop {
			let frame = match call_stack.last_mut() {
				Some(frame) => frame,
				None => return Err(ExitFatal::UnhandledInterrupt),
			};

			let capture = {
				let Frame { machine, logs, .. } = &mut *frame;
				let mut handler = StackHandler {
					state: &mut *state,
					backend: &*self.backend,
					logs,
				};
				machine.run(&mut handler)
			};

			match capture {
				Capture::Trap(request) => match self.spawn_child(state, frame, request)? {
					Spawn::Frame(child) => call_stack.push(child),
					Spawn::Finished(result) => resume(frame, result),
				},
				Capture::Exit(reason) => {
					let Frame {
						machine,
						context,
						created,
						logs,
						internal_transactions,
					} = match call_stack.pop() {
						Some(frame) => frame,
						None => return Err(ExitFatal::UnhandledInterrupt),
					};
					log::debug!(
						target: "fastvm",
						"Frame at depth {} for {:?} exited: {:?}",
						context.depth(),
						context.recipient(),
						reason,
					);
					let result = self.exit_frame(
						state,
						created,
						reason,
						machine.return_value(),
						logs,
						internal_transactions,
					)?;
					match call_stack.last_mut() {
						Some(parent) => resume(parent, result),
						None => return Ok(result),
					}
				}
			}
		}
	}

	fn next_index(&mut self) -> u32 {
		let index = self.next_index;
		self.next_index += 1;
		index
	}

	/// Turn a request of the running frame into a child frame.
	fn spawn_child(
		&mut self,
		state: &mut TrackedState<'config>,
		parent: &Frame<I::Machine>,
		request: CallRequest,
	) -> Result<Spawn<I::Machine>, ExitFatal> {
		let parent_context = &parent.context;
		let depth = parent_context.depth() + 1;
		let current = parent_context.recipient();
		let nonce = state.basic(current, &*self.backend).nonce;
		let created = match request.kind {
			CallKind::Create => Some(create_address(current, nonce, self.config)),
			_ => None,
		};
		let value = match request.kind {
			CallKind::DelegateCall => parent_context.call_value(),
			_ => request.value,
		};

		let mut record = InternalTransaction {
			parent_hash: self.transaction_hash,
			depth,
			index: self.next_index(),
			nonce,
			kind: request.kind,
			from: current,
			to: created.unwrap_or(request.address),
			value,
			data: request.data.clone(),
			nrg_limit: request.nrg_limit,
			rejected: None,
		};

		let is_static = state.metadata().is_static();
		let flags = if is_static || request.is_static {
			STATIC_FLAG
		} else {
			0
		};
		let moves_value = !request.value.is_zero()
			&& matches!(request.kind, CallKind::Call | CallKind::CallCode | CallKind::Create);

		let early = if depth as usize > self.config.max_call_depth {
			Some(ExitError::CallDepthLimitExceeded)
		} else if is_static
			&& (request.kind == CallKind::Create
				|| (request.kind == CallKind::Call && !request.value.is_zero()))
		{
			Some(ExitError::StaticModeError)
		} else if moves_value && state.basic(current, &*self.backend).balance < request.value {
			Some(ExitError::InsufficientBalance)
		} else {
			None
		};
		if let Some(error) = early {
			log::debug!(target: "fastvm", "Request at depth {} refused: {:?}", depth, error);
			record.reject(error.into());
			let mut result = ExecutionResult::rejected(error);
			result.internal_transactions.push(record);
			return Ok(Spawn::Finished(result));
		}

		let nrg_limit = min(request.nrg_limit, state.metadata().gasometer().gas());
		record.nrg_limit = nrg_limit;

		let (context, code, transfer) = match request.kind {
			CallKind::Call => (
				self.context(
					parent_context.origin(),
					current,
					request.address,
					value,
					nrg_limit,
					request.data,
					depth,
					request.kind,
					flags,
				)?,
				state.code(request.address, &*self.backend),
				Some((current, request.address)),
			),
			CallKind::CallCode => (
				self.context(
					parent_context.origin(),
					current,
					current,
					value,
					nrg_limit,
					request.data,
					depth,
					request.kind,
					flags,
				)?,
				state.code(request.address, &*self.backend),
				Some((current, current)),
			),
			CallKind::DelegateCall => (
				self.context(
					parent_context.origin(),
					parent_context.caller(),
					current,
					value,
					nrg_limit,
					request.data,
					depth,
					request.kind,
					flags,
				)?,
				state.code(request.address, &*self.backend),
				None,
			),
			CallKind::Create => {
				let mut context = self.context(
					parent_context.origin(),
					current,
					Address::zero(),
					value,
					nrg_limit,
					Vec::new(),
					depth,
					request.kind,
					flags,
				)?;
				if let Some(address) = created {
					context.set_recipient(address);
				}
				// the creator nonce moves whether or not the create succeeds
				state.inc_nonce(current, &*self.backend);
				(context, request.data, created.map(|address| (current, address)))
			}
		};

		self.enter_frame(
			state,
			FrameEntry {
				context,
				code_address: created.unwrap_or(request.address),
				code,
				transfer,
				created,
				nrg_limit,
				record: Some(record),
			},
		)
	}

	/// Charge the current substate for a new frame and open the frame on top.
	fn enter_frame(
		&mut self,
		state: &mut TrackedState<'config>,
		entry: FrameEntry,
	) -> Result<Spawn<I::Machine>, ExitFatal> {
		let FrameEntry {
			context,
			code_address,
			code,
			transfer,
			created,
			nrg_limit,
			record,
		} = entry;
		let internal_transactions: Vec<InternalTransaction> = record.into_iter().collect();

		state
			.metadata_mut()
			.gasometer_mut()
			.record_cost(nrg_limit)
			.map_err(|_| ExitFatal::Other("frame energy above what the caller has left"))?;
		state.enter(nrg_limit, context.is_static());
		log::trace!(
			target: "fastvm",
			"Entering {:?} frame at depth {} with code of {:?}, energy {}",
			context.kind(),
			context.depth(),
			code_address,
			nrg_limit,
		);

		if let Some(address) = created {
			event!(Create {
				caller: context.caller(),
				address,
				value: context.call_value(),
				init_code: &code,
				nrg_limit,
			});

			let existing = state.basic(address, &*self.backend);
			if existing.nonce != U256::zero() || !state.code(address, &*self.backend).is_empty() {
				return self
					.fail_entry(state, ExitError::ContractAlreadyExists, internal_transactions)
					.map(Spawn::Finished);
			}
			state.reset_storage(address, &*self.backend);
		} else {
			event!(Call {
				code_address,
				context: &context,
			});
		}

		if let Some((source, target)) = transfer {
			if let Err(error) =
				state.transfer(source, target, context.call_value(), &*self.backend)
			{
				return self
					.fail_entry(state, error, internal_transactions)
					.map(Spawn::Finished);
			}
		}

		if code.is_empty() {
			return self
				.exit_frame(
					state,
					created,
					ExitReason::Succeed,
					Vec::new(),
					Vec::new(),
					internal_transactions,
				)
				.map(Spawn::Finished);
		}

		let machine = self.interpreter.instantiate(Rc::new(code), &context);
		Ok(Spawn::Frame(Frame {
			machine,
			context,
			created,
			logs: Vec::new(),
			internal_transactions,
		}))
	}

	fn fail_entry(
		&mut self,
		state: &mut TrackedState<'config>,
		error: ExitError,
		internal_transactions: Vec<InternalTransaction>,
	) -> Result<ExecutionResult, ExitFatal> {
		self.exit_frame(
			state,
			None,
			ExitReason::Error(error),
			Vec::new(),
			Vec::new(),
			internal_transactions,
		)
	}

	/// Fold the newest substate into its parent according to `reason`.
	fn exit_frame(
		&mut self,
		state: &mut TrackedState<'config>,
		created: Option<Address>,
		reason: ExitReason,
		return_value: Vec<u8>,
		logs: Vec<Log>,
		mut internal_transactions: Vec<InternalTransaction>,
	) -> Result<ExecutionResult, ExitFatal> {
		let (reason, return_value) = emit_exit!(reason, return_value);
		let (code, nrg_left, output, logs, contract_address) = match reason {
			ExitReason::Succeed => match created {
				Some(address) => {
					match state
						.metadata_mut()
						.gasometer_mut()
						.record_deposit(return_value.len())
					{
						Ok(()) => {
							state.set_code(address, return_value.clone(), &*self.backend);
							let nrg_left = state.metadata().gasometer().gas();
							state.exit_commit()?;
							(ResultCode::Success, nrg_left, return_value, logs, Some(address))
						}
						Err(error) => {
							state.exit_discard()?;
							(error.into(), 0, Vec::new(), Vec::new(), None)
						}
					}
				}
				None => {
					let nrg_left = state.metadata().gasometer().gas();
					state.exit_commit()?;
					(ResultCode::Success, nrg_left, return_value, logs, None)
				}
			},
			ExitReason::Revert => {
				let nrg_left = state.metadata().gasometer().gas();
				state.exit_revert()?;
				(ResultCode::Failure, nrg_left, return_value, Vec::new(), None)
			}
			ExitReason::Error(error) => {
				state.metadata_mut().gasometer_mut().fail();
				state.exit_discard()?;
				(error.into(), 0, Vec::new(), Vec::new(), None)
			}
			ExitReason::Fatal(fatal) => return Err(fatal),
		};

		if !code.is_success() {
			for itx in internal_transactions.iter_mut() {
				itx.reject(code);
			}
		}

		Ok(ExecutionResult {
			code,
			nrg_left,
			output,
			contract_address,
			logs,
			internal_transactions,
		})
	}
}

/// Hand a finished child back to its parent frame.
fn resume<M: Machine>(parent: &mut Frame<M>, mut result: ExecutionResult) {
	parent.machine.finish_call(&result);
	parent.logs.append(&mut result.logs);
	parent
		.internal_transactions
		.append(&mut result.internal_transactions);
}

/// [`Handler`] given to the running frame.
struct StackHandler<'a, 'config, B> {
	state: &'a mut TrackedState<'config>,
	backend: &'a B,
	logs: &'a mut Vec<Log>,
}

impl<'a, 'config, B: Backend> StackHandler<'a, 'config, B> {
	fn check_static(&self) -> Result<(), ExitError> {
		if self.state.metadata().is_static() {
			Err(ExitError::StaticModeError)
		} else {
			Ok(())
		}
	}
}

impl<'a, 'config, B: Backend> Handler for StackHandler<'a, 'config, B> {
	fn balance(&self, address: Address) -> Word {
		self.state.basic(address, self.backend).balance
	}

	fn nonce(&self, address: Address) -> U256 {
		self.state.basic(address, self.backend).nonce
	}

	fn code(&self, address: Address) -> Vec<u8> {
		self.state.code(address, self.backend)
	}

	fn storage(&self, address: Address, key: Word) -> Word {
		self.state.storage(address, key, self.backend)
	}

	fn exists(&self, address: Address) -> bool {
		self.state.exists(address, self.backend)
	}

	fn deleted(&self, address: Address) -> bool {
		self.state.deleted(address)
	}

	fn gas_left(&self) -> u64 {
		self.state.metadata().gasometer().gas()
	}

	fn record_cost(&mut self, cost: u64) -> Result<(), ExitError> {
		self.state.metadata_mut().gasometer_mut().record_cost(cost)
	}

	fn record_refund(&mut self, refund: i64) {
		self.state.metadata_mut().gasometer_mut().record_refund(refund)
	}

	fn set_storage(&mut self, address: Address, key: Word, value: Word) -> Result<(), ExitError> {
		self.check_static()?;
		self.state.set_storage(address, key, value);
		Ok(())
	}

	fn log(&mut self, address: Address, topics: Vec<H256>, data: Vec<u8>) -> Result<(), ExitError> {
		self.check_static()?;
		self.logs.push(Log {
			address,
			topics,
			data,
		});
		Ok(())
	}

	fn mark_delete(&mut self, address: Address, target: Address) -> Result<(), ExitError> {
		self.check_static()?;
		let balance = self.balance(address);

		event!(MarkDelete {
			address,
			target,
			balance,
		});

		self.state.transfer(address, target, balance, self.backend)?;
		self.state.reset_balance(address, self.backend);
		self.state.set_deleted(address);

		Ok(())
	}
}
