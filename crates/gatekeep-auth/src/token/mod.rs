//! Signed token encoding, decoding, and claims management.

pub mod claims;
pub mod codec;

pub use claims::Claims;
pub use codec::{IssuedToken, TokenCodec, TokenError};
