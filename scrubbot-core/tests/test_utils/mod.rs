// File: scrubbot-core/tests/test_utils/mod.rs
#![allow(dead_code)]

pub mod fake_platform;
pub mod helpers;

pub use fake_platform::{FakePlatform, PlatformCall};
pub use helpers::*;
