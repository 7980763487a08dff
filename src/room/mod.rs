pub mod coord;
pub mod data;
pub mod name;
pub mod terrain;
