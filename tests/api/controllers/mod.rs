mod chapter;
mod home;
mod images;
mod interaction;
mod manga;
mod me;
