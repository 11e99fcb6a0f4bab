//! tasksync-test-utils: test infrastructure for tasksync.
//!
//! Provides:
//! - TestCa: generated CA plus server/client certificate pairs
//! - FakeTaskd: minimal mutual-TLS sync server answering framed requests
//! - write_script: fake external task binaries as shell scripts

mod certs;
mod fake_taskd;
mod script;

pub use certs::TestCa;
pub use fake_taskd::FakeTaskd;
pub use script::write_script;
