#![warn(rust_2018_idioms)]

pub mod error;
pub mod requests;
pub mod server;
pub mod settings;
pub mod state;

pub use error::Error;
pub use server::{run, Stats};
