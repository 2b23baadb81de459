pub mod config;
pub mod engine;
pub mod eval;
pub mod store;
pub mod text;
pub mod wallpaper;

pub use config::*;
pub use engine::{Engine, EngineState, Rule, Turn};
pub use store::*;
pub use text::{normalize, title_case};
