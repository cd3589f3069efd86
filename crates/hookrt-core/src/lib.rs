#![doc = r"Hook runtime: persistent per-instance state for stateless render functions."]

pub mod collections;
mod component;
pub mod config;
mod context;
mod deps;
mod effect;
mod element;
mod error;
pub mod hash;
mod hook_store;
pub mod hooks;
mod instance;
mod memo;
pub mod owned;
pub mod platform;
mod reducer;
pub mod runtime;
mod scope;
mod state;
mod tree;

pub use component::{Component, Props};
pub use config::RuntimeConfig;
pub use context::{Context, ContextKey};
pub use deps::{DepKey, Deps};
pub use effect::{Cleanup, EffectState, IntoCleanup};
pub use element::Element;
pub use error::{Error, Result};
pub use hook_store::SlotKind;
pub use instance::{ChildKey, InstanceId, Lifecycle};
pub use memo::Callback;
pub use owned::Owned;
pub use platform::{Clock, Host, KeyValueStore, RuntimeScheduler, TimerHost, TimerToken};
pub use reducer::Dispatch;
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle};
pub use scope::Scope;
pub use state::{Setter, Update};
pub use tree::RenderTree;

#[cfg(test)]
#[path = "tests/hook_store_tests.rs"]
mod hook_store_tests;

#[cfg(test)]
#[path = "tests/memo_tests.rs"]
mod memo_tests;

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod context_tests;

#[cfg(test)]
#[path = "tests/reducer_tests.rs"]
mod reducer_tests;

#[cfg(test)]
#[path = "tests/effect_tests.rs"]
mod effect_tests;

#[cfg(test)]
#[path = "tests/tree_tests.rs"]
mod tree_tests;

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod hooks_tests;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
