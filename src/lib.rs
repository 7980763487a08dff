#![warn(clippy::all)]

pub mod algorithms;
pub mod config;
pub mod constants;
pub mod creep;
pub mod economy;
pub mod error;
pub mod game_loop;
pub mod host;
pub mod logging;
pub mod pathing;
pub mod room;
pub mod serialize;
pub mod spawnsystem;
pub mod store;
pub mod territory;
pub mod transfer;

pub use game_loop::Engine;
