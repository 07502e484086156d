pub mod save_to_local;
