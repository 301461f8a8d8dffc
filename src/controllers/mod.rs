pub mod auth;
pub mod chapter;
pub mod home;
pub mod images;
pub mod interaction;
pub mod manga;
pub mod me;
