pub mod entity;
pub mod source;

pub use entity::{Category, CategoryFilter, GeoEntity, OwnerProfile, PostDraft, ValidPost};
pub use source::{InMemoryEntityStore, RestEntitySource};
