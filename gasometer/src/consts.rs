pub const NRG_CODE_DEPOSIT: u64 = 1000;
pub const NRG_TX_CREATE: u64 = 200_000;
pub const NRG_TX_DATA_ZERO: u64 = 4;
pub const NRG_TX_DATA_NONZERO: u64 = 64;
pub const NRG_TRANSACTION: u64 = 21_000;
pub const MAX_CALL_DEPTH: usize = 128;

pub const NRG_SSTORE_CLEAR_REFUND: u64 = 15_000;
pub const MAX_REFUND_QUOTIENT: u64 = 2;
