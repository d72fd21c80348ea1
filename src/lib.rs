//! # shrinkr
//!
//! An LZ compressor with near-optimal parsing and adaptive binary range
//! coding, tuned for small executables and demo data where every byte of
//! output counts and compression time is cheap.
//!
//! ## Features
//!
//! - **Optimal-parse search** over a bounded graph of candidate references
//! - **Context-modelled range coding** with a repeated-offset shortcut
//! - **Iterative refinement**: each pass prices symbols with the statistics
//!   of the passes before it
//! - Safe decoding of untrusted streams
//!
//! ## Example
//!
//! ```rust
//! use shrinkr::{compress, decompress, PackOptions};
//!
//! let data = b"to be or not to be, that is the question";
//! let (packed, stats) = compress(data, 0, &PackOptions::default()).unwrap();
//! println!("{} -> {} bytes", data.len(), packed.len());
//! assert_eq!(stats.best_size_bytes(), packed.len());
//!
//! let unpacked = decompress(&packed, true).unwrap();
//! assert_eq!(unpacked, data);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bits;
pub mod coder;
pub mod compress;
pub mod decode;
pub mod error;

pub use compress::{compress, compress_with_progress, pack_data, PackOptions, PackStats};
pub use decode::{decompress, decompress_with_limit};
pub use error::{Error, Result};
