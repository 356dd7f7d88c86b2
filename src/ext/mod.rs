mod path_ext;

pub use path_ext::{PathExt, base_name, best_effort_path_display, entry_name};
