pub mod config;
pub mod config_resolution;
pub mod delivery;
pub mod inbound_server;
pub mod logging;
pub mod node;

pub use config::Config;
pub use node::Node;
