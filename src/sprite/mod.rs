mod readback;
mod sprite;

pub use readback::{BlitReadback, Readback};
pub use sprite::{BorderInset, SpriteImage};
