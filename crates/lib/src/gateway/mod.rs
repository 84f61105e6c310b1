//! Gateway: HTTP server hosting the LINE webhook.
//!
//! One port, two routes: `POST /webhook` for platform deliveries and `GET /` for health checks.

mod server;

pub use server::{router, run_gateway, GatewayState};
