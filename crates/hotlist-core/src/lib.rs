// Library root for the hot-topics ranking core: storage, rank assembly and
// the vote/buy mutations.

pub mod db;
pub mod error;
pub mod model;
pub mod mutation;
pub mod rank;
pub mod service;
pub mod store;

pub use error::{Result, ServiceError};
pub use service::HotList;
