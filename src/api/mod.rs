pub mod relay;
pub mod server;

pub use relay::{relay_router, RelayRequest, RelayState};
pub use server::{start_relay_server, RelayServer};
