mod store;

pub use store::{load_file, ConfigFormat, ConfigStore};
