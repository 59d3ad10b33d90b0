// Utility module

pub mod file;

pub use file::{FileUtils, TestFilter};
