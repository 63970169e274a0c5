pub mod checkout;
pub mod courses;
pub mod media;
pub mod progress;
pub mod purchases;
pub mod root;
pub mod users;
