//! Error taxonomy for the runtime.
//!
//! Four families are kept apart so callers can react differently:
//! configuration/verification problems ([`SetupError`]), misuse of runtime
//! state ([`StateError`]), per-organism evaluation failures ([`EvalError`])
//! and I/O or serialization failures ([`ResourceError`]). [`MabeError`] wraps
//! all four for APIs that can fail in more than one way.

use crate::simulation::OrgPosition;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring modules or verifying trait declarations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    #[error("duplicate owner: {trait_name} (declared by '{first}' and '{second}')")]
    DuplicateOwner {
        trait_name: String,
        first: String,
        second: String,
    },

    #[error("no owner for trait: {trait_name} (required by {required_by})")]
    NoOwner {
        trait_name: String,
        required_by: String,
    },

    #[error("write conflict on trait '{trait_name}': owned by '{owner}' but shared by '{writer}'")]
    WriteConflict {
        trait_name: String,
        owner: String,
        writer: String,
    },

    #[error("type mismatch on trait '{trait_name}': module '{module}' declares {found}, expected {expected}")]
    TypeMismatch {
        trait_name: String,
        module: String,
        expected: String,
        found: String,
    },

    #[error("module '{module}' declared trait '{trait_name}' more than once")]
    DuplicateDeclaration { trait_name: String, module: String },

    #[error("module '{module}' declared trait '{trait_name}' outside of module setup")]
    TraitsLocked { trait_name: String, module: String },

    #[error("unknown option '{option}' for '{module}'")]
    UnknownOption { module: String, option: String },

    #[error("invalid value for option '{option}' of '{module}': {reason}")]
    InvalidOption {
        module: String,
        option: String,
        reason: String,
    },

    #[error("unknown module or organism type: {0}")]
    UnknownModule(String),

    #[error("unknown population: {0}")]
    UnknownPopulation(String),

    #[error("name already in use: {0}")]
    DuplicateName(String),

    #[error("invalid collection '{spec}': {reason}")]
    InvalidCollection { spec: String, reason: String },

    #[error("unknown member function '{function}' on '{module}'")]
    UnknownFunction { module: String, function: String },

    #[error("setup has already completed")]
    AlreadySetup,
}

impl SetupError {
    /// The trait, option, module or population name this error is about.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::DuplicateOwner { trait_name, .. }
            | Self::NoOwner { trait_name, .. }
            | Self::WriteConflict { trait_name, .. }
            | Self::TypeMismatch { trait_name, .. }
            | Self::DuplicateDeclaration { trait_name, .. }
            | Self::TraitsLocked { trait_name, .. } => Some(trait_name),
            Self::UnknownOption { option, .. } | Self::InvalidOption { option, .. } => {
                Some(option)
            }
            Self::UnknownModule(name)
            | Self::UnknownPopulation(name)
            | Self::DuplicateName(name) => Some(name),
            Self::InvalidCollection { spec, .. } => Some(spec),
            Self::UnknownFunction { function, .. } => Some(function),
            Self::AlreadySetup => None,
        }
    }
}

/// Errors caused by using runtime state the wrong way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("data map has no locked layout")]
    NotLocked,

    #[error("trait not present in layout: {0}")]
    MissingTrait(String),

    #[error("trait '{trait_name}' holds {found} values, requested {expected}")]
    TypeMismatch {
        trait_name: String,
        expected: String,
        found: String,
    },

    #[error("trait '{trait_name}' has arity {found}, requested {expected}")]
    ArityMismatch {
        trait_name: String,
        expected: usize,
        found: usize,
    },

    #[error("index {index} out of range for trait '{trait_name}' (arity {arity})")]
    IndexOutOfRange {
        trait_name: String,
        index: usize,
        arity: usize,
    },

    #[error("trait '{0}' is generated and cannot be written")]
    GeneratedWrite(String),

    #[error("trait handle '{0}' used before it was resolved against a layout")]
    UnresolvedHandle(String),

    #[error("layout field '{0}' already exists")]
    DuplicateField(String),

    #[error("setup has not completed")]
    NotSetup,

    #[error("no organism at {0}")]
    EmptySlot(OrgPosition),

    #[error("no population with id {0}")]
    UnknownPopulation(usize),

    #[error("placement outside its population: {0}")]
    InvalidPlacement(OrgPosition),

    #[error("organism type mismatch: expected {expected}, found {found}")]
    WrongOrganismType { expected: String, found: String },
}

impl StateError {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::MissingTrait(name)
            | Self::GeneratedWrite(name)
            | Self::UnresolvedHandle(name)
            | Self::DuplicateField(name) => Some(name),
            Self::TypeMismatch { trait_name, .. }
            | Self::ArityMismatch { trait_name, .. }
            | Self::IndexOutOfRange { trait_name, .. } => Some(trait_name),
            Self::WrongOrganismType { expected, .. } => Some(expected),
            _ => None,
        }
    }
}

/// A failure while scoring a single organism. Never aborts a generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{module}: organism at {position} has {found} bits, expected {expected}")]
    GenomeLength {
        module: String,
        position: OrgPosition,
        expected: usize,
        found: usize,
    },

    #[error("{module}: organism at {position} could not be evaluated: {source}")]
    State {
        module: String,
        position: OrgPosition,
        #[source]
        source: StateError,
    },
}

impl EvalError {
    pub fn module(&self) -> &str {
        match self {
            Self::GenomeLength { module, .. } | Self::State { module, .. } => module,
        }
    }

    pub fn position(&self) -> OrgPosition {
        match self {
            Self::GenomeLength { position, .. } | Self::State { position, .. } => *position,
        }
    }
}

/// File and serialization failures.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialize(String),
}

impl ResourceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ResourceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialize(err.to_string())
    }
}

/// Which family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Setup,
    State,
    Eval,
    Resource,
}

/// Top-level error for operations on the control object.
#[derive(Debug, Error)]
pub enum MabeError {
    #[error("setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("state error: {0}")]
    State(#[from] StateError),

    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("resource error: {0}")]
    Resource(#[from] ResourceError),
}

impl MabeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Setup(_) => ErrorKind::Setup,
            Self::State(_) => ErrorKind::State,
            Self::Eval(_) => ErrorKind::Eval,
            Self::Resource(_) => ErrorKind::Resource,
        }
    }

    /// Offending name, when the underlying error carries one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Setup(err) => err.name(),
            Self::State(err) => err.name(),
            Self::Eval(err) => Some(err.module()),
            Self::Resource(_) => None,
        }
    }
}

pub type Result<T, E = MabeError> = std::result::Result<T, E>;
