pub mod download_manager;
pub mod errors;
pub mod fs;
pub mod network;
pub mod progress_tracker;
pub mod split_parts;
