//! Transaction execution

pub mod executor;
pub mod router;

pub use executor::{Invocation, Receipt, TransactionExecutor};
pub use router::TokenRouter;
