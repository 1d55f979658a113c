mod admin;
mod link;
mod upload;

pub use admin::health;
pub use link::{bad_verb, index, link, redirect_callback};
pub use upload::{upload_file, upload_ignored};
