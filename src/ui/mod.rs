pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, file_imported, header, info, section, success, timing, warn};
pub use progress::Spinner;
pub use table::{TableBuilder, stats_table};
pub use theme::{theme, Theme};
