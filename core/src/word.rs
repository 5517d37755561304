use alloc::vec::Vec;
use core::convert::TryFrom;
use core::fmt;
use core::str::FromStr;
use primitive_types::{U128, U256};

/// Error raised when a [`Word`] cannot be built from its input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WordError {
	/// Input is wider than 16 bytes. Carries the offending length.
	ValueTooLarge(usize),
	/// Input is not valid hexadecimal.
	InvalidHex,
}

#[cfg(feature = "std")]
impl std::error::Error for WordError {}

impl fmt::Display for WordError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::ValueTooLarge(len) => {
				write!(f, "data word can't exceed {} bytes, got {}", Word::BYTES, len)
			}
			Self::InvalidHex => write!(f, "data word is not valid hex"),
		}
	}
}

/// Basic unit of data seen by the virtual machine: a 128-bit unsigned value
/// stored as 16 big-endian bytes.
///
/// Ordering is unsigned lexicographic over the byte representation, which
/// coincides with numeric ordering.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
	feature = "with-codec",
	derive(scale_codec::Encode, scale_codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Word([u8; 16]);

impl Word {
	/// Width of a word in bytes.
	pub const BYTES: usize = 16;
	pub const ZERO: Word = Word([0u8; 16]);
	pub const ONE: Word = Word([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
	pub const MAX: Word = Word([0xff; 16]);

	/// Build a word from at most 16 big-endian bytes. Shorter input is
	/// left-padded with zeroes.
	pub fn from_slice(data: &[u8]) -> Result<Self, WordError> {
		if data.len() > Self::BYTES {
			return Err(WordError::ValueTooLarge(data.len()));
		}

		let mut bytes = [0u8; 16];
		bytes[Self::BYTES - data.len()..].copy_from_slice(data);
		Ok(Word(bytes))
	}

	pub const fn from_bytes(bytes: [u8; 16]) -> Self {
		Word(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 16] {
		&self.0
	}

	pub fn to_vec(&self) -> Vec<u8> {
		self.0.to_vec()
	}

	/// Bytes with leading zeroes removed. A zero word keeps a single zero
	/// byte.
	pub fn no_lead_zeroes_data(&self) -> &[u8] {
		match self.0.iter().position(|b| *b != 0) {
			Some(first) => &self.0[first..],
			None => &self.0[Self::BYTES - 1..],
		}
	}

	/// Unsigned value of this word.
	pub fn value(&self) -> U128 {
		U128::from_big_endian(&self.0)
	}

	pub fn as_u128(&self) -> u128 {
		u128::from_be_bytes(self.0)
	}

	/// Trailing four bytes folded big-endian.
	pub fn low_u32(&self) -> u32 {
		self.0[12..]
			.iter()
			.fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
	}

	/// Trailing eight bytes folded big-endian.
	pub fn low_u64(&self) -> u64 {
		self.0[8..]
			.iter()
			.fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
	}

	pub fn is_zero(&self) -> bool {
		self.0.iter().all(|b| *b == 0)
	}

	/// Whether the top bit is set, for consumers reading the word as a
	/// two's-complement value.
	pub fn is_negative(&self) -> bool {
		self.0[0] & 0x80 == 0x80
	}

	pub fn checked_add(&self, other: Word) -> Option<Word> {
		self.as_u128().checked_add(other.as_u128()).map(Word::from)
	}

	pub fn checked_sub(&self, other: Word) -> Option<Word> {
		self.as_u128().checked_sub(other.as_u128()).map(Word::from)
	}

	pub fn checked_mul(&self, other: Word) -> Option<Word> {
		self.as_u128().checked_mul(other.as_u128()).map(Word::from)
	}

	pub fn saturating_add(&self, other: Word) -> Word {
		Word::from(self.as_u128().saturating_add(other.as_u128()))
	}

	pub fn saturating_sub(&self, other: Word) -> Word {
		Word::from(self.as_u128().saturating_sub(other.as_u128()))
	}
}

impl From<u32> for Word {
	fn from(value: u32) -> Self {
		Word::from(u128::from(value))
	}
}

impl From<u64> for Word {
	fn from(value: u64) -> Self {
		Word::from(u128::from(value))
	}
}

/// Two's complement in the trailing four bytes, leading bytes zero.
impl From<i32> for Word {
	fn from(value: i32) -> Self {
		Word::from(value as u32)
	}
}

/// Two's complement in the trailing eight bytes, leading bytes zero.
impl From<i64> for Word {
	fn from(value: i64) -> Self {
		Word::from(value as u64)
	}
}

impl From<u128> for Word {
	fn from(value: u128) -> Self {
		Word(value.to_be_bytes())
	}
}

impl From<U128> for Word {
	fn from(value: U128) -> Self {
		let mut bytes = [0u8; 16];
		value.to_big_endian(&mut bytes);
		Word(bytes)
	}
}

impl From<Word> for U128 {
	fn from(word: Word) -> Self {
		word.value()
	}
}

impl From<Word> for U256 {
	fn from(word: Word) -> Self {
		U256::from_big_endian(&word.0)
	}
}

impl TryFrom<U256> for Word {
	type Error = WordError;

	fn try_from(value: U256) -> Result<Self, Self::Error> {
		if value.bits() > 128 {
			return Err(WordError::ValueTooLarge((value.bits() + 7) / 8));
		}

		let mut bytes = [0u8; 32];
		value.to_big_endian(&mut bytes);
		Word::from_slice(&bytes[16..])
	}
}

impl TryFrom<&[u8]> for Word {
	type Error = WordError;

	fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
		Word::from_slice(data)
	}
}

impl FromStr for Word {
	type Err = WordError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.strip_prefix("0x").unwrap_or(s);
		let data = hex::decode(s).map_err(|_| WordError::InvalidHex)?;
		Word::from_slice(&data)
	}
}

impl AsRef<[u8]> for Word {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::LowerHex for Word {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for byte in &self.0 {
			write!(f, "{:02x}", byte)?;
		}
		Ok(())
	}
}

impl fmt::Display for Word {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::LowerHex::fmt(self, f)
	}
}

impl fmt::Debug for Word {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Word(0x{:x})", self)
	}
}
