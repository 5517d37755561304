use crate::Config;

/// Intrinsic cost of a transaction, counted before any code runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionCost {
	Call {
		zero_data_len: usize,
		non_zero_data_len: usize,
	},
	Create {
		zero_data_len: usize,
		non_zero_data_len: usize,
	},
}

impl TransactionCost {
	pub fn call(data: &[u8]) -> Self {
		let zero_data_len = data.iter().filter(|v| **v == 0).count();
		TransactionCost::Call {
			zero_data_len,
			non_zero_data_len: data.len() - zero_data_len,
		}
	}

	pub fn create(data: &[u8]) -> Self {
		let zero_data_len = data.iter().filter(|v| **v == 0).count();
		TransactionCost::Create {
			zero_data_len,
			non_zero_data_len: data.len() - zero_data_len,
		}
	}

	pub fn cost(&self, config: &Config) -> u64 {
		match *self {
			TransactionCost::Call {
				zero_data_len,
				non_zero_data_len,
			} => data_cost(zero_data_len, non_zero_data_len, config) + config.nrg_transaction,
			TransactionCost::Create {
				zero_data_len,
				non_zero_data_len,
			} => {
				data_cost(zero_data_len, non_zero_data_len, config)
					+ config.nrg_transaction
					+ config.nrg_tx_create
			}
		}
	}
}

fn data_cost(zero_data_len: usize, non_zero_data_len: usize, config: &Config) -> u64 {
	zero_data_len as u64 * config.nrg_tx_data_zero
		+ non_zero_data_len as u64 * config.nrg_tx_data_nonzero
}

/// Intrinsic cost of a transaction carrying `data`.
pub fn transaction_cost(data: &[u8], is_create: bool, config: &Config) -> u64 {
	if is_create {
		TransactionCost::create(data).cost(config)
	} else {
		TransactionCost::call(data).cost(config)
	}
}
