use core::fmt;
use primitive_types::H256;

/// Width of a bloom filter in bytes (2048 bits).
pub const BLOOM_BYTES: usize = 256;

/// Log index filter.
///
/// Every hash fed into the filter sets three bits. A filter built from many
/// hashes is the union of the per-hash filters, so a query hash can only be
/// present if all of its bits are set.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
	feature = "with-codec",
	derive(scale_codec::Encode, scale_codec::Decode, scale_info::TypeInfo)
)]
pub struct Bloom([u8; BLOOM_BYTES]);

impl Default for Bloom {
	fn default() -> Self {
		Bloom([0u8; BLOOM_BYTES])
	}
}

impl Bloom {
	pub fn new() -> Self {
		Self::default()
	}

	pub const fn from_bytes(data: [u8; BLOOM_BYTES]) -> Self {
		Bloom(data)
	}

	/// Filter with the three bits selected by `hash`.
	///
	/// Each bit position is read from a byte pair at offsets 0, 2 and 4:
	/// the low three bits of the first byte followed by the whole second
	/// byte, which always lands inside the 2048-bit array.
	pub fn create(hash: &H256) -> Self {
		let bytes = hash.as_bytes();
		let mut bloom = Bloom::default();
		for pair in bytes[..6].chunks(2) {
			let position = (usize::from(pair[0] & 7) << 8) + usize::from(pair[1]);
			bloom.set_bit(position);
		}
		bloom
	}

	fn set_bit(&mut self, position: usize) {
		let index = BLOOM_BYTES - 1 - position / 8;
		self.0[index] |= 1 << (position % 8);
	}

	/// Add the bits of `hash` to this filter.
	pub fn accrue(&mut self, hash: &H256) {
		self.union(&Bloom::create(hash));
	}

	pub fn union(&mut self, other: &Bloom) {
		for (byte, other) in self.0.iter_mut().zip(other.0.iter()) {
			*byte |= *other;
		}
	}

	pub fn intersect(&mut self, other: &Bloom) {
		for (byte, other) in self.0.iter_mut().zip(other.0.iter()) {
			*byte &= *other;
		}
	}

	/// Whether every bit of `query` is already set here, tested by checking
	/// that OR-ing `query` in leaves this filter unchanged.
	pub fn matches(&self, query: &Bloom) -> bool {
		let mut merged = *self;
		merged.union(query);
		merged == *self
	}

	/// Whether every bit of `query` is already set here, tested by checking
	/// that AND-ing with `query` gives back `query`.
	pub fn contains(&self, query: &Bloom) -> bool {
		let mut common = *self;
		common.intersect(query);
		common == *query
	}

	pub fn contains_hash(&self, hash: &H256) -> bool {
		self.contains(&Bloom::create(hash))
	}

	pub fn is_empty(&self) -> bool {
		self.0.iter().all(|b| *b == 0)
	}

	pub fn data(&self) -> &[u8; BLOOM_BYTES] {
		&self.0
	}
}

impl<'a> core::iter::FromIterator<&'a H256> for Bloom {
	fn from_iter<I: IntoIterator<Item = &'a H256>>(iter: I) -> Self {
		let mut bloom = Bloom::default();
		for hash in iter {
			bloom.accrue(hash);
		}
		bloom
	}
}

impl fmt::Debug for Bloom {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Bloom(0x")?;
		for byte in self.0.iter() {
			write!(f, "{:02x}", byte)?;
		}
		write!(f, ")")
	}
}

#[cfg(feature = "with-serde")]
impl serde::Serialize for Bloom {
	fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&hex::encode(self.0))
	}
}

#[cfg(feature = "with-serde")]
impl<'de> serde::Deserialize<'de> for Bloom {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		use serde::de::Error;

		let text = <alloc::string::String as serde::Deserialize>::deserialize(deserializer)?;
		let raw = hex::decode(text.trim_start_matches("0x")).map_err(D::Error::custom)?;
		if raw.len() != BLOOM_BYTES {
			return Err(D::Error::invalid_length(raw.len(), &"256 bytes"));
		}
		let mut data = [0u8; BLOOM_BYTES];
		data.copy_from_slice(&raw);
		Ok(Bloom(data))
	}
}
