//! Authentication primitives: password hashing, JWT access/refresh
//! sessions and opaque workflow tokens.

mod hasher;
mod jwt;
mod token;

pub use hasher::{Argon2Hasher, PasswordHasher};
pub use jwt::{Claims, JwtAuth, TokenPair, TokenUse};
pub use token::{random_hex_token, SUBMISSION_TOKEN_LEN};
