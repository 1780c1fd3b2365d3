//! Fundamental data types shared by the window manager crates.

pub mod geometry;

pub use geometry::{scale_dest_rect, Rect, ScalingMode, Size};
