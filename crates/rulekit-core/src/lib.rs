#![forbid(unsafe_code)]

//! Core: geometry primitives shared by the tree editor and the drag protocol.

pub mod geometry;

pub use geometry::{Position, Rect};
