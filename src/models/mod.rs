//! Persistent entities operated on by the session engine.

mod account;
mod role;
mod session;

pub use account::{Account, RegisterCredentials};
pub use role::{Permission, Role};
pub use session::{Session, SessionKind};
