//! In-memory stand-ins for the document store, for tests here and in
//! downstream crates.
mod test_record;
mod test_store;

pub use cmd_util::env::config_test as init_test_logging;
pub use test_record::{
    TestRecord,
    assets,
};
pub use test_store::TestStore;
