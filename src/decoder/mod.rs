pub mod frame;
pub mod geometry;
pub mod video;

pub use frame::{Frame, VideoMeta};
pub use geometry::{OutputGeometry, ScaleMode};
pub use video::VideoDecoder;
