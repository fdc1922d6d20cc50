//! Support services around the finishing pipeline

pub mod io;

pub use io::FrameIOService;
