//! Testing utilities and harness for hookrt

pub mod recording_host;
pub mod testing;

pub use recording_host::{Commit, RecordingHost};
pub use testing::*;

pub mod prelude {
    pub use crate::recording_host::{Commit, RecordingHost};
    pub use crate::testing::*;
    pub use hookrt_core::{deps, Component, Element, Error, InstanceId, Scope};
}
