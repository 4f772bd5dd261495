//! Result type alias for CST operations

use crate::error::CstError;

/// Standard Result type for CST operations
pub type Result<T> = std::result::Result<T, CstError>;
