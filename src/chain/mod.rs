//! Chain primitives shared by the harness and the node protocol
//!
//! Names, assets, keys, authorities, and transactions as the node sees them.

pub mod asset;
pub mod authority;
pub mod keys;
pub mod name;
pub mod transaction;

pub use asset::{Asset, Symbol, SymbolCode};
pub use authority::{Authority, Permission, PermissionLevel, ACTIVE, OWNER};
pub use keys::{KeyPair, PublicKey, Signature};
pub use name::Name;
pub use transaction::{Action, SignedTransaction, Transaction, SYSTEM_ACCOUNT};
