mod renderer;

pub use renderer::{FileListing, TreeRenderer};
