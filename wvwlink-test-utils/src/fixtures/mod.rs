//! Fixtures for the mocked upstream APIs.
//!
//! - `account` - account API payloads and endpoints

pub mod account;
