//! Map provider plumbing: the script loader and an in-process backend

pub mod headless;
pub mod loader;

pub use headless::HeadlessMap;
pub use loader::{ProviderLoader, ScriptLoadError};
