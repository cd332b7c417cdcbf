//! Session credential signing and verification

mod codec;

pub use codec::{SessionClaims, SessionCodec, SESSION_COOKIE_NAME, SESSION_MAX_AGE_SECS};
