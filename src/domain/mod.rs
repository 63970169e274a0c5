pub mod user;
pub mod course;
pub mod purchase;
pub mod progress;
pub mod review;
pub mod money;

pub use user::*;
pub use course::*;
pub use purchase::*;
pub use progress::*;
pub use review::*;
