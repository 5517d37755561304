use core::fmt;

/// Capture represents the result of running a machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capture<E, T> {
	/// The machine has exited. It cannot be executed again.
	Exit(E),
	/// The machine has trapped. It is waiting for external information, and
	/// can be resumed.
	Trap(T),
}

impl<E, T> Capture<E, T> {
	pub fn exit(self) -> Option<E> {
		match self {
			Self::Exit(e) => Some(e),
			Self::Trap(_) => None,
		}
	}

	pub fn trap(self) -> Option<T> {
		match self {
			Self::Exit(_) => None,
			Self::Trap(t) => Some(t),
		}
	}
}

/// Reason a call frame stopped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
	feature = "with-codec",
	derive(scale_codec::Encode, scale_codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExitReason {
	/// Frame finished normally. State changes are kept.
	Succeed,
	/// Frame executed an explicit revert. State changes are dropped but the
	/// unused energy goes back to the caller.
	Revert,
	/// Frame failed. State changes are dropped and all of its energy is
	/// consumed.
	Error(ExitError),
	/// The transaction cannot continue at all.
	Fatal(ExitFatal),
}

impl ExitReason {
	pub fn is_succeed(&self) -> bool {
		matches!(self, Self::Succeed)
	}

	pub fn is_revert(&self) -> bool {
		matches!(self, Self::Revert)
	}

	pub fn is_error(&self) -> bool {
		matches!(self, Self::Error(_))
	}

	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Fatal(_))
	}
}

/// Recoverable frame failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
	feature = "with-codec",
	derive(scale_codec::Encode, scale_codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExitError {
	OutOfEnergy,
	BadInstruction,
	BadJumpDestination,
	StackOverflow,
	StackUnderflow,
	/// State mutation attempted inside a read-only frame.
	StaticModeError,
	/// Caller cannot cover the value of a call or create.
	InsufficientBalance,
	/// Call would nest deeper than the configured limit.
	CallDepthLimitExceeded,
	/// Create targeted an address that already holds code or a nonce.
	ContractAlreadyExists,
}

impl From<ExitError> for ExitReason {
	fn from(e: ExitError) -> Self {
		ExitReason::Error(e)
	}
}

#[cfg(feature = "std")]
impl std::error::Error for ExitError {}

impl fmt::Display for ExitError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:?}", self)
	}
}

/// Faults that abort the whole transaction without touching durable state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(
	feature = "with-codec",
	derive(scale_codec::Encode, scale_codec::Decode, scale_info::TypeInfo)
)]
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExitFatal {
	/// Operation not supported by this executor.
	NotSupported,
	/// A trap arrived with no frame to resume.
	UnhandledInterrupt,
	/// Energy bookkeeping went inconsistent.
	#[cfg_attr(feature = "with-codec", codec(skip))]
	#[cfg_attr(feature = "with-serde", serde(skip))]
	Other(&'static str),
}

impl From<ExitFatal> for ExitReason {
	fn from(e: ExitFatal) -> Self {
		ExitReason::Fatal(e)
	}
}

#[cfg(feature = "std")]
impl std::error::Error for ExitFatal {}

impl fmt::Display for ExitFatal {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Other(msg) => write!(f, "fatal: {}", msg),
			other => write!(f, "fatal: {:?}", other),
		}
	}
}
