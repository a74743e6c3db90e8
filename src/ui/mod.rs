pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    dim, entity_block, error, fact_line, header, lesson_line, muted, section, status,
    success, summary_row, warn,
};
pub use table::{TableBuilder, stats_table};
pub use theme::{Theme, theme};
