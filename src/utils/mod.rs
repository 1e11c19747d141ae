pub mod image_ops;
pub mod metrics;

// Re-export commonly used items
pub use image_ops::{encode_png_async, encode_png_sync, load_rgb_from_memory_async};
pub use metrics::{Metrics, MetricsSnapshot};
