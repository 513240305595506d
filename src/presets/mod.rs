pub mod embedded;
pub mod loader;

pub use loader::{list_presets, load_preset, Preset};
