use crate::{Address, Word, ADDRESS_LEN};
use alloc::vec::Vec;
use core::convert::TryFrom;
use core::fmt;
use primitive_types::H256;

/// Frame flag marking a read-only call.
pub const STATIC_FLAG: u32 = 0x1;

/// Size of the fixed part of an encoded context.
pub const ENCODED_FIXED_LEN: usize = 4 * ADDRESS_LEN + 3 * Word::BYTES + 4 * 8 + 4 * 4;

/// Errors raised while building or decoding an [`ExecutionContext`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContextError {
	/// Transaction hash of the wrong length.
	InvalidTransactionHash(usize),
	/// Call kind tag outside of the known set.
	UnknownKind(u32),
	/// Encoding ended before every field was read.
	Truncated,
	/// Bytes left over after the last field.
	TrailingBytes(usize),
}

#[cfg(feature = "std")]
impl std::error::Error for ContextError {}

impl fmt::Display for ContextError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::InvalidTransactionHash(len) => {
				write!(f, "transaction hash must be 32 bytes, got {}", len)
			}
			Self::UnknownKind(kind) => write!(f, "unknown call kind {}", kind),
			Self::Truncated => write!(f, "context encoding is truncated"),
			Self::TrailingBytes(len) => write!(f, "{} trailing bytes after context", len),
		}
	}
}

/// How the child frame derives its caller, recipient and value.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(
	feature = "with-codec",
	derive(codec::Encode, codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum CallKind {
	/// Run the target's code against the target's account.
	Call = 0,
	/// Run the target's code against the current account, keeping caller and value.
	DelegateCall = 1,
	/// Run the target's code against the current account.
	CallCode = 2,
	/// Run init code against a freshly derived account.
	Create = 3,
}

impl CallKind {
	pub fn as_u32(self) -> u32 {
		self as u32
	}

	pub fn is_create(self) -> bool {
		self == CallKind::Create
	}
}

impl TryFrom<u32> for CallKind {
	type Error = ContextError;

	fn try_from(value: u32) -> Result<Self, Self::Error> {
		match value {
			0 => Ok(CallKind::Call),
			1 => Ok(CallKind::DelegateCall),
			2 => Ok(CallKind::CallCode),
			3 => Ok(CallKind::Create),
			other => Err(ContextError::UnknownKind(other)),
		}
	}
}

/// Block the transaction is executed in.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(
	feature = "with-codec",
	derive(codec::Encode, codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockEnv {
	pub coinbase: Address,
	pub number: u64,
	pub timestamp: u64,
	pub nrg_limit: u64,
	pub difficulty: Word,
}

/// Description of one call frame.
///
/// Built by the executor right before a frame is handed to the interpreter.
/// The only field that changes afterwards is the recipient of a `CREATE`
/// frame, see [`ExecutionContext::set_recipient`].
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionContext {
	transaction_hash: H256,
	recipient: Address,
	origin: Address,
	caller: Address,
	nrg_price: Word,
	nrg_limit: u64,
	call_value: Word,
	call_data: Vec<u8>,
	depth: u32,
	kind: CallKind,
	flags: u32,
	block: BlockEnv,
}

impl ExecutionContext {
	/// Create a new context. `transaction_hash` must be exactly 32 bytes.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		transaction_hash: &[u8],
		recipient: Address,
		origin: Address,
		caller: Address,
		nrg_price: Word,
		nrg_limit: u64,
		call_value: Word,
		call_data: Vec<u8>,
		depth: u32,
		kind: CallKind,
		flags: u32,
		block: BlockEnv,
	) -> Result<Self, ContextError> {
		if transaction_hash.len() != 32 {
			return Err(ContextError::InvalidTransactionHash(transaction_hash.len()));
		}

		Ok(Self {
			transaction_hash: H256::from_slice(transaction_hash),
			recipient,
			origin,
			caller,
			nrg_price,
			nrg_limit,
			call_value,
			call_data,
			depth,
			kind,
			flags,
			block,
		})
	}

	pub fn transaction_hash(&self) -> H256 {
		self.transaction_hash
	}

	pub fn recipient(&self) -> Address {
		self.recipient
	}

	/// Point a `CREATE` frame at its derived contract address.
	pub fn set_recipient(&mut self, recipient: Address) {
		self.recipient = recipient;
	}

	pub fn origin(&self) -> Address {
		self.origin
	}

	pub fn caller(&self) -> Address {
		self.caller
	}

	pub fn nrg_price(&self) -> Word {
		self.nrg_price
	}

	pub fn nrg_limit(&self) -> u64 {
		self.nrg_limit
	}

	pub fn call_value(&self) -> Word {
		self.call_value
	}

	pub fn call_data(&self) -> &[u8] {
		&self.call_data
	}

	pub fn depth(&self) -> u32 {
		self.depth
	}

	pub fn kind(&self) -> CallKind {
		self.kind
	}

	pub fn flags(&self) -> u32 {
		self.flags
	}

	pub fn is_static(&self) -> bool {
		self.flags & STATIC_FLAG != 0
	}

	pub fn block(&self) -> &BlockEnv {
		&self.block
	}

	pub fn block_coinbase(&self) -> Address {
		self.block.coinbase
	}

	pub fn block_number(&self) -> u64 {
		self.block.number
	}

	pub fn block_timestamp(&self) -> u64 {
		self.block.timestamp
	}

	pub fn block_nrg_limit(&self) -> u64 {
		self.block.nrg_limit
	}

	pub fn block_difficulty(&self) -> Word {
		self.block.difficulty
	}

	/// Length of [`ExecutionContext::to_bytes`].
	pub fn encoded_len(&self) -> usize {
		ENCODED_FIXED_LEN + self.call_data.len()
	}

	/// Big-endian encoding handed to native interpreters.
	///
	/// Layout: `recipient, origin, caller, nrg_price, nrg_limit, call_value,
	/// len(call_data), call_data, depth, kind, flags, coinbase, number,
	/// timestamp, block_nrg_limit, difficulty`. The transaction hash is not
	/// part of it.
	pub fn to_bytes(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(self.encoded_len());
		out.extend_from_slice(self.recipient.as_bytes());
		out.extend_from_slice(self.origin.as_bytes());
		out.extend_from_slice(self.caller.as_bytes());
		out.extend_from_slice(self.nrg_price.as_bytes());
		out.extend_from_slice(&self.nrg_limit.to_be_bytes());
		out.extend_from_slice(self.call_value.as_bytes());
		out.extend_from_slice(&(self.call_data.len() as u32).to_be_bytes());
		out.extend_from_slice(&self.call_data);
		out.extend_from_slice(&self.depth.to_be_bytes());
		out.extend_from_slice(&self.kind.as_u32().to_be_bytes());
		out.extend_from_slice(&self.flags.to_be_bytes());
		out.extend_from_slice(self.block.coinbase.as_bytes());
		out.extend_from_slice(&self.block.number.to_be_bytes());
		out.extend_from_slice(&self.block.timestamp.to_be_bytes());
		out.extend_from_slice(&self.block.nrg_limit.to_be_bytes());
		out.extend_from_slice(self.block.difficulty.as_bytes());
		out
	}

	/// Inverse of [`ExecutionContext::to_bytes`].
	pub fn decode(transaction_hash: &[u8], data: &[u8]) -> Result<Self, ContextError> {
		let mut reader = Reader { data };

		let recipient = reader.address()?;
		let origin = reader.address()?;
		let caller = reader.address()?;
		let nrg_price = reader.word()?;
		let nrg_limit = reader.u64()?;
		let call_value = reader.word()?;
		let call_data_len = reader.u32()? as usize;
		let call_data = reader.take(call_data_len)?.to_vec();
		let depth = reader.u32()?;
		let kind = CallKind::try_from(reader.u32()?)?;
		let flags = reader.u32()?;
		let block = BlockEnv {
			coinbase: reader.address()?,
			number: reader.u64()?,
			timestamp: reader.u64()?,
			nrg_limit: reader.u64()?,
			difficulty: reader.word()?,
		};

		if !reader.data.is_empty() {
			return Err(ContextError::TrailingBytes(reader.data.len()));
		}

		Self::new(
			transaction_hash,
			recipient,
			origin,
			caller,
			nrg_price,
			nrg_limit,
			call_value,
			call_data,
			depth,
			kind,
			flags,
			block,
		)
	}
}

struct Reader<'a> {
	data: &'a [u8],
}

impl<'a> Reader<'a> {
	fn take(&mut self, len: usize) -> Result<&'a [u8], ContextError> {
		if self.data.len() < len {
			return Err(ContextError::Truncated);
		}
		let (head, tail) = self.data.split_at(len);
		self.data = tail;
		Ok(head)
	}

	fn address(&mut self) -> Result<Address, ContextError> {
		Ok(Address::from_slice(self.take(ADDRESS_LEN)?))
	}

	fn word(&mut self) -> Result<Word, ContextError> {
		let mut bytes = [0u8; Word::BYTES];
		bytes.copy_from_slice(self.take(Word::BYTES)?);
		Ok(Word::from_bytes(bytes))
	}

	fn u64(&mut self) -> Result<u64, ContextError> {
		let mut bytes = [0u8; 8];
		bytes.copy_from_slice(self.take(8)?);
		Ok(u64::from_be_bytes(bytes))
	}

	fn u32(&mut self) -> Result<u32, ContextError> {
		let mut bytes = [0u8; 4];
		bytes.copy_from_slice(self.take(4)?);
		Ok(u32::from_be_bytes(bytes))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn block() -> BlockEnv {
		BlockEnv {
			coinbase: Address::repeat_byte(0xcb),
			number: 7,
			timestamp: 1_600_000_000,
			nrg_limit: 10_000_000,
			difficulty: Word::from(0x0102u32),
		}
	}

	fn context(data: Vec<u8>) -> ExecutionContext {
		ExecutionContext::new(
			&[0x11; 32],
			Address::repeat_byte(0xaa),
			Address::repeat_byte(0xbb),
			Address::repeat_byte(0xcc),
			Word::from(10_000_000_000u64),
			1_000_000,
			Word::from(5u32),
			data,
			2,
			CallKind::CallCode,
			STATIC_FLAG,
			block(),
		)
		.unwrap()
	}

	#[test]
	fn rejects_short_transaction_hash() {
		let err = ExecutionContext::new(
			&[0u8; 31],
			Address::zero(),
			Address::zero(),
			Address::zero(),
			Word::ZERO,
			0,
			Word::ZERO,
			Vec::new(),
			0,
			CallKind::Call,
			0,
			BlockEnv::default(),
		)
		.unwrap_err();
		assert_eq!(err, ContextError::InvalidTransactionHash(31));
	}

	#[test]
	fn encoding_layout() {
		let ctx = context(vec![0xde, 0xad, 0xbe]);
		let bytes = ctx.to_bytes();

		assert_eq!(bytes.len(), 4 * 32 + 48 + 32 + 16 + 3);
		assert_eq!(bytes.len(), ctx.encoded_len());
		assert_eq!(&bytes[0..32], &[0xaa; 32][..]);
		assert_eq!(&bytes[32..64], &[0xbb; 32][..]);
		assert_eq!(&bytes[64..96], &[0xcc; 32][..]);
		assert_eq!(
			hex::encode(&bytes[96..112]),
			"000000000000000000000002540be400"
		);
		assert_eq!(hex::encode(&bytes[112..120]), "00000000000f4240");
		assert_eq!(bytes[135], 5);
		assert_eq!(hex::encode(&bytes[136..140]), "00000003");
		assert_eq!(&bytes[140..143], &[0xde, 0xad, 0xbe]);
		assert_eq!(hex::encode(&bytes[143..155]), "000000020000000200000001");
		assert_eq!(&bytes[155..187], &[0xcb; 32][..]);
		assert_eq!(hex::encode(&bytes[187..195]), "0000000000000007");
		assert_eq!(bytes[bytes.len() - 2..], [0x01, 0x02]);
	}

	#[test]
	fn decode_restores_every_field() {
		let ctx = context(vec![1, 0, 2]);
		let decoded = ExecutionContext::decode(&[0x11; 32], &ctx.to_bytes()).unwrap();
		assert_eq!(decoded, ctx);
		assert!(decoded.is_static());
		assert_eq!(decoded.block_timestamp(), 1_600_000_000);
	}

	#[test]
	fn decode_rejects_malformed_input() {
		let bytes = context(Vec::new()).to_bytes();

		assert_eq!(
			ExecutionContext::decode(&[0x11; 32], &bytes[..bytes.len() - 1]),
			Err(ContextError::Truncated)
		);

		let mut longer = bytes.clone();
		longer.push(0);
		assert_eq!(
			ExecutionContext::decode(&[0x11; 32], &longer),
			Err(ContextError::TrailingBytes(1))
		);

		let mut bad_kind = bytes;
		bad_kind[140 + 7] = 9;
		assert_eq!(
			ExecutionContext::decode(&[0x11; 32], &bad_kind),
			Err(ContextError::UnknownKind(9))
		);
	}

	#[test]
	fn create_frames_take_a_new_recipient() {
		let mut ctx = context(Vec::new());
		let address = Address::repeat_byte(0xa0);
		ctx.set_recipient(address);
		assert_eq!(ctx.recipient(), address);
		assert_eq!(&ctx.to_bytes()[..32], address.as_bytes());
	}

	#[test]
	fn call_kind_tags() {
		for kind in [
			CallKind::Call,
			CallKind::DelegateCall,
			CallKind::CallCode,
			CallKind::Create,
		] {
			assert_eq!(CallKind::try_from(kind.as_u32()), Ok(kind));
		}
		assert_eq!(CallKind::try_from(4), Err(ContextError::UnknownKind(4)));
	}
}
