//! Depth stream files
//!
//! A stream file starts with a fixed header followed by frame records. In
//! dynamic-fps mode every record carries the milliseconds elapsed since the
//! previous frame before the raw sample payload:
//!
//! ```text
//! u8   platform_id
//! u32  width            (little-endian, as are all integers below)
//! u32  height
//! u32  bytes_per_pixel
//! u32  fps_mode         0 = per-frame timestamps, otherwise fixed fps
//! repeated:
//!   u32  elapsed_ms     (only when fps_mode == 0)
//!   [u8; width * height * bytes_per_pixel]
//! ```

mod header;
mod writer;
mod reader;

#[cfg(test)]
mod tests;

pub use header::{FpsMode, StreamFileHeader, HEADER_LEN, MAX_FRAME_BYTES};
pub use writer::{StreamWriter, WriteSummary, WriterKind, WRITER_QUEUE_CAPACITY};
pub use reader::{RecordedFrame, StreamFileReader};
