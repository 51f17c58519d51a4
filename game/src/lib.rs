#![warn(rust_2018_idioms)]

pub mod client;
pub mod deck;
pub mod model;
pub mod protocol;
pub mod session;
