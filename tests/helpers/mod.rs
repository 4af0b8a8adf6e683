#![allow(dead_code)]

pub mod builders;
pub mod mock_api;

pub use builders::{ProjectBuilder, SessionBuilder};
pub use mock_api::{MockApi, RecordedRequest};
