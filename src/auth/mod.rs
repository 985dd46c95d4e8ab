//! Authentication: password hashing, token codec and the access-token gate

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{TokenCodec, TokenError, TokenKind, TokenPair};
pub use middleware::{access_token_gate, extract_token, AuthContext};
pub use password::PasswordHasher;
