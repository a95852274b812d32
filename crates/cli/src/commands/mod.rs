pub mod apps;
pub mod sessions;
