//! Domain records shared by the resolver, the acquisition pipeline and the
//! host-facing surfaces.

pub mod entity;
pub mod settings;

pub use entity::*;
pub use settings::*;
