//! OAuth 2.0 client token primitives
//!
//! Value objects, the storage contract and the token endpoint seam used by
//! the credential manager. This crate holds no policy: deciding when a token
//! is usable and when to refresh lives in `credential-manager`.
//!
//! Record flow:
//! 1. Caller builds a `Context` (user id + optional scope)
//! 2. `Scope::parse` canonicalizes scopes so lookups ignore token order
//! 3. `Storage` persists `AccessToken`, `RefreshToken` and `AuthState`
//!    records keyed by client config id, user id and scope
//! 4. `TokenExchanger::exchange_refresh_token` redeems a refresh token

pub mod config;
pub mod context;
pub mod error;
pub mod exchange;
mod fields;
pub mod file;
pub mod memory;
pub mod scope;
pub mod state;
pub mod storage;
pub mod token;

pub use config::{ClientConfig, StaticClientConfig};
pub use context::Context;
pub use error::{Error, Result};
pub use exchange::{HttpTokenExchanger, TokenExchanger, TokenResponse};
pub use fields::Fields;
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use scope::Scope;
pub use state::AuthState;
pub use storage::Storage;
pub use token::{AccessToken, RefreshToken, TokenIdentity};
