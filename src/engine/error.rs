// Engine error types

use crate::vram::VramError;
use std::fmt;

/// Errors reported by the engine lifecycle and per-frame surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Operation requires an initialized engine
    Uninitialized,

    /// Invalid argument at init or viewport/projection setup
    Config(String),

    /// An auxiliary buffer or pool could not be allocated
    OutOfMemory(String),

    /// No draw callback registered for the requested frame
    MissingCallback,

    /// Video memory allocator failure
    Vram(VramError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Uninitialized => write!(f, "engine is not initialized"),
            EngineError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            EngineError::OutOfMemory(msg) => write!(f, "out of memory: {}", msg),
            EngineError::MissingCallback => write!(f, "no draw callback registered"),
            EngineError::Vram(e) => write!(f, "video memory error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Vram(e) => Some(e),
            _ => None,
        }
    }
}

impl From<VramError> for EngineError {
    fn from(e: VramError) -> Self {
        match e {
            VramError::InvalidConfig(msg) => EngineError::Config(msg),
            other => EngineError::Vram(other),
        }
    }
}
