pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod directory;
pub mod state;
pub mod transport;
