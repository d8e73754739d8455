use std::fmt;

/// Errors from structural validation of a block or transaction (C3).
#[derive(Debug)]
pub enum ValidationError {
    /// Static, precomputed message.
    Invalid(&'static str),
    /// Dynamic message.
    Custom(String),
    /// The submitted block already has `block_size` transactions.
    TooManyTransactions,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Invalid(msg) => write!(f, "invalid block: {msg}"),
            ValidationError::Custom(msg) => write!(f, "invalid block: {msg}"),
            ValidationError::TooManyTransactions => write!(f, "block is already at its transaction limit"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// High-level error kinds a node controller reacts to, per `spec.md` §7.
#[derive(Debug)]
pub enum ConsensusError {
    /// Wire payload did not parse into a well-typed message.
    MalformedMessage(String),
    /// Block's parent is not present in the tree.
    UnknownParent,
    /// Block's creator did not match the expected creator at that slot.
    WrongCreator,
    /// Block failed `Block::validate` (a [`ValidationError`]).
    StructuralInvalid(ValidationError),
    /// Hash already known; nothing to do.
    DuplicateReceive,
    /// A signed object (block/transaction/judgement) failed signature
    /// verification.
    SignatureInvalid,
    /// A peer did not respond before the network adapter's timeout.
    PeerUnreachable(String),
    /// A disk write in the persistence adapter failed.
    PersistenceFailure(String),
    /// Storage-related failure unrelated to persistence I/O proper, e.g. a
    /// missing block the caller assumed was present.
    Storage(String),
    /// Catch-all for conditions not covered above.
    Other(String),
}

impl From<ValidationError> for ConsensusError {
    fn from(e: ValidationError) -> Self {
        ConsensusError::StructuralInvalid(e)
    }
}

impl fmt::Display for ConsensusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusError::MalformedMessage(msg) => write!(f, "malformed message: {msg}"),
            ConsensusError::UnknownParent => write!(f, "unknown parent"),
            ConsensusError::WrongCreator => write!(f, "unexpected block creator"),
            ConsensusError::StructuralInvalid(e) => write!(f, "{e}"),
            ConsensusError::DuplicateReceive => write!(f, "already known"),
            ConsensusError::SignatureInvalid => write!(f, "signature invalid"),
            ConsensusError::PeerUnreachable(msg) => write!(f, "peer unreachable: {msg}"),
            ConsensusError::PersistenceFailure(msg) => write!(f, "persistence failure: {msg}"),
            ConsensusError::Storage(msg) => write!(f, "storage error: {msg}"),
            ConsensusError::Other(msg) => write!(f, "consensus error: {msg}"),
        }
    }
}

impl std::error::Error for ConsensusError {}
