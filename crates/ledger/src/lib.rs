pub mod store;

pub use store::{service_unavailable_row, FileLedger, LedgerError, LedgerStore};
