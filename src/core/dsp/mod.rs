//! Digital Signal Processing utilities

pub mod fft;
pub mod filters;
pub mod lpc;
pub mod mel;
pub mod stats;
pub mod windows;

pub use fft::{centered_frame_count, pad_center, Stft};
pub use filters::{median_filter, pre_emphasis};
pub use lpc::{burg, polynomial_roots, LpcError};
pub use mel::{power_to_db_ref_max, MelFilterbank};
pub use stats::EPSILON;
