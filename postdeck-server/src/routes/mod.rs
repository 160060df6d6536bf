pub mod compose;
pub mod home;
pub mod keys;
pub mod posts;
pub mod workspaces;
