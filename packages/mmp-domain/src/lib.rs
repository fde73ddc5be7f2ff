pub mod classifier;
pub mod clipboard;
pub mod date_serde;
pub mod dependencies;
pub mod draft;
pub mod reorder;
pub mod status;
pub mod validate;
