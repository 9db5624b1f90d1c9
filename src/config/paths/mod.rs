pub mod xdg_root;

pub use xdg_root::{config_home, data_home, default_snapshot_path, global_config_path, APP_DIR};
