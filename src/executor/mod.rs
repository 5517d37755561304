//! # Executors
//!
//! Executors hook the gasometer, the tracked state and an interpreter
//! together, and own the call stack of a transaction.

mod stack;

pub use self::stack::{
	Stage, StackExitKind, StackSubstateMetadata, TrackedState, TransactionExecutor,
};
