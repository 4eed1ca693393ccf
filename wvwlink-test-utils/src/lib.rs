//! Test fixtures for wvwlink.
//!
//! A [`TestSetup`] owns a mockito server standing in for the account API. Fixtures are
//! reached through [`TestSetup::account`] and register mock endpoints whose expected hit
//! counts are verified by [`TestSetup::assert_mocks`].

pub mod constant;
pub mod fixtures;
pub mod setup;

pub use setup::TestSetup;

pub mod prelude {
    pub use crate::{constant::*, fixtures::account::factory, TestSetup};
}
