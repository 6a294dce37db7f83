pub mod effect_renderer;
pub mod frame;
pub mod gpu;
pub mod layout;
pub mod material;
pub mod source;
