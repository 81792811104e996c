//! Reading chain state and node output

pub mod log;
pub mod state;

pub use log::NodeLog;
pub use state::{account_info, deployed_abi, get_balance, read_table, read_table_paged};
