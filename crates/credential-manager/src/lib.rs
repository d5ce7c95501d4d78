//! OAuth 2.0 credential manager
//!
//! Decides whether a stored access token can be used, transparently
//! refreshes it when expired, and issues the CSRF state for the
//! authorization-code redirect. Storage, the token endpoint, time and
//! randomness are all injected, so the manager itself is stateless.
//!
//! Credential lifecycle:
//! 1. Caller asks `get_authorize_uri()` → state stored, user redirected
//! 2. Callback handler redeems the code and stores the tokens (out of scope)
//! 3. `get_access_token()` returns the cached token while it is valid
//! 4. Expired token → deleted, refresh token exchanged, new token stored
//! 5. Refresh rejected → refresh token deleted, `None` returned
//! 6. `None` means the user has to go through step 1 again

pub mod clock;
pub mod error;
pub mod manager;
mod metrics;
pub mod random;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use manager::CredentialManager;
pub use random::{RandomStateGenerator, STATE_BYTES, StateGenerator};
