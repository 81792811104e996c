//! Chain node process management and wire protocol
//!
//! The node is an external process speaking `Content-Length` framed JSON on
//! stdio. [`NodeSupervisor`] owns its lifecycle; [`NodeClient`] performs the
//! request/response exchanges.

pub mod client;
pub mod codec;
pub mod supervisor;
pub mod types;

pub use client::NodeClient;
pub use supervisor::NodeSupervisor;
pub use types::*;
