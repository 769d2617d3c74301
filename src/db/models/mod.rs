mod file;
mod user;

pub use file::*;
pub use user::*;
