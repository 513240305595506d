pub mod audio;
pub mod config;
pub mod encode;
pub mod presets;
pub mod render;
pub mod viz;
