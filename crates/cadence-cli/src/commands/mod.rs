pub mod check;
pub mod config;
pub mod due;
pub mod item;
pub mod stats;
