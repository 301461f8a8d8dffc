mod controllers;
mod helper;
mod middlewares;

pub use helper::*;
