pub mod aggregation;
pub mod board;
pub mod dashboard;
pub mod location_search;
pub mod priority;
pub mod ranking;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod transitions;
