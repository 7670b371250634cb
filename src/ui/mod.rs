pub mod icons;
pub mod table;

pub use table::{Table, status_cell, tag_cell};
