// Adapters layer: concrete implementations of the domain ports for external systems.

pub mod docker;
pub mod http;
pub mod memory;
pub mod net;
pub mod storage;

pub use docker::DockerCli;
pub use http::HttpConsoleProbe;
pub use net::LocalPortProbe;
pub use storage::LocalStorage;
