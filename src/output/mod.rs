pub mod formatter;

pub use formatter::{
    format_index_detail, format_results_table, format_value, should_use_colors,
};
