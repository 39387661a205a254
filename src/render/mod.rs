mod core;

pub use core::{AnsiRenderer, RendererSettings};
