mod heuristic;
mod maxrects;
mod rect;

pub use heuristic::{ALL_HEURISTICS, PackMode, PackingHeuristic};
pub use maxrects::MaxRectsPacker;
pub use rect::Rect;
