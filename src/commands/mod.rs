pub mod delete;
pub mod delete_pages;
pub mod extract;
pub mod extract_index;
pub mod undo;
