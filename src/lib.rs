pub mod batch;
pub mod bus;
pub mod cli;
pub mod config;
pub mod decode;
pub mod delta;
pub mod player;
pub mod source;
pub mod stats;
pub mod timeframe;
