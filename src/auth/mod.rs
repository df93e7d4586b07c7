//! Login, session, and identity reconciliation.
//!
//! The provider login path: [`OAuthExchanger`] exchanges the authorization
//! code, [`IdentityReconciler`] resolves the claims to a local account, and
//! [`TokenCodec`] issues the session token the client presents afterwards.
//! [`session_middleware`] is the guard protected routes sit behind.

pub mod oauth;
pub mod reconcile;
pub mod session;
pub mod token;

pub use oauth::{IdentityClaims, OAuthExchanger};
pub use reconcile::IdentityReconciler;
pub use session::{bearer_token, session_middleware};
pub use token::{TokenCodec, TokenError};
