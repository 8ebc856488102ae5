//! Shared fixtures for the controller test suites

#![allow(dead_code)]

pub mod environment;
pub mod runner;
pub mod scm;

pub use environment::TestEnvironment;
pub use runner::RecordingRunner;
pub use scm::FakeScm;
