//! Byte-level conversion between fragment representations, and validation of
//! uploaded bytes against their declared type.
//!
//! Everything here is a pure function of its inputs. Image work is CPU-bound;
//! async callers should run it on a blocking thread.

pub mod convert;
pub mod error;
pub mod raster;
pub mod validate;

pub use convert::convert;
pub use error::{ConvertError, ValidationError};
pub use validate::validate;
