mod normalize;

pub use normalize::{normalize, cover, Error, Result, TargetSize, JPEG_QUALITY};
