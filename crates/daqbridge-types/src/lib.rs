//! Shared vocabulary for every `daqbridge` crate: the object-kind hierarchy,
//! the integer result codes of the C surface, and the workspace-wide error
//! type.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Integer result codes returned across the C boundary.
///
/// Zero is success; every failure is negative so callers can test `< 0`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok = 0,
    Generic = -1,
    InvalidPointer = -2,
    MethodNotImplemented = -3,
    TypeMismatch = -4,
    PropertyDoesntExist = -5,
    OutOfBounds = -6,
    InvalidId = -7,
    NotAvailable = -8,
    Io = -9,
    Uninitialized = -10,
    InsufficientSize = -11,
    InvalidJson = -12,
    Sdk = -13,
}

impl ErrorCode {
    /// Raw integer value handed to C callers.
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.as_i32()
    }
}

/// Concrete kind of a wrapped object.
///
/// The kind is fixed when a handle is created and decides which command
/// handlers see a call, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Device,
    Channel,
    FunctionBlock,
    Signal,
    InputPort,
    DataDescriptor,
    SyncComponent,
    PropertyObject,
}

impl ObjectKind {
    /// The next, more general kind in the fallback hierarchy.
    /// `PropertyObject` is the root and has no parent.
    pub fn parent(self) -> Option<ObjectKind> {
        match self {
            ObjectKind::Channel => Some(ObjectKind::FunctionBlock),
            ObjectKind::PropertyObject => None,
            _ => Some(ObjectKind::PropertyObject),
        }
    }

    /// The full fallback chain starting with `self` and ending with
    /// `PropertyObject`.
    pub fn chain(self) -> Vec<ObjectKind> {
        let mut chain = vec![self];
        let mut current = self;
        while let Some(parent) = current.parent() {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    /// Whether a handle of this kind can stand in for `other`.
    pub fn is_a(self, other: ObjectKind) -> bool {
        self.chain().contains(&other)
    }

    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Device => "Device",
            ObjectKind::Channel => "Channel",
            ObjectKind::FunctionBlock => "FunctionBlock",
            ObjectKind::Signal => "Signal",
            ObjectKind::InputPort => "InputPort",
            ObjectKind::DataDescriptor => "DataDescriptor",
            ObjectKind::SyncComponent => "SyncComponent",
            ObjectKind::PropertyObject => "PropertyObject",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Workspace-wide error type. Every variant maps onto one [`ErrorCode`].
#[derive(Error, Debug)]
pub enum DaqError {
    #[error("{0}")]
    Generic(String),

    #[error("Invalid value '{value}' for '{item}'.")]
    InvalidValue { item: String, value: String },

    #[error("Invalid object handle.")]
    InvalidHandle,

    #[error("Null pointer passed for '{0}'.")]
    NullPointer(&'static str),

    #[error("Method '{0}' is not implemented.")]
    MethodNotImplemented(String),

    #[error("Object of kind {found} cannot be used as {expected}.")]
    TypeMismatch {
        expected: ObjectKind,
        found: ObjectKind,
    },

    #[error("Property '{0}' does not exist.")]
    PropertyDoesntExist(String),

    #[error("Index out of bounds.")]
    OutOfBounds { index: usize, len: usize },

    #[error("Invalid id '{0}'.")]
    InvalidId(String),

    #[error("Not available: {0}.")]
    NotAvailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No samples have been read.")]
    Uninitialized,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("SDK error: {0}")]
    Sdk(String),
}

impl DaqError {
    /// The C result code this error is reported as.
    pub fn code(&self) -> ErrorCode {
        match self {
            DaqError::Generic(_) | DaqError::InvalidValue { .. } => ErrorCode::Generic,
            DaqError::InvalidHandle | DaqError::NullPointer(_) => ErrorCode::InvalidPointer,
            DaqError::MethodNotImplemented(_) => ErrorCode::MethodNotImplemented,
            DaqError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            DaqError::PropertyDoesntExist(_) => ErrorCode::PropertyDoesntExist,
            DaqError::OutOfBounds { .. } => ErrorCode::OutOfBounds,
            DaqError::InvalidId(_) => ErrorCode::InvalidId,
            DaqError::NotAvailable(_) => ErrorCode::NotAvailable,
            DaqError::Io(_) => ErrorCode::Io,
            DaqError::Uninitialized => ErrorCode::Uninitialized,
            DaqError::InvalidJson(_) => ErrorCode::InvalidJson,
            DaqError::Sdk(_) => ErrorCode::Sdk,
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        DaqError::Generic(message.into())
    }

    pub fn sdk(message: impl Into<String>) -> Self {
        DaqError::Sdk(message.into())
    }

    pub fn not_available(what: impl Into<String>) -> Self {
        DaqError::NotAvailable(what.into())
    }

    pub fn no_property(name: impl Into<String>) -> Self {
        DaqError::PropertyDoesntExist(name.into())
    }
}

pub type DaqResult<T> = Result<T, DaqError>;
