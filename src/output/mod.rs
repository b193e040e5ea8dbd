pub mod formatter;
pub mod writer;

pub use formatter::{format_summary, should_use_colors};
pub use writer::write_json_pretty;
