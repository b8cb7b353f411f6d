//! Media generation
//!
//! GIF assembly of stored timelapse frames.

mod gif_assembler;

pub use gif_assembler::{encode_frames, AssembledGif, FrameTiming, GifAssembler, GifConfig};
