//! NeoCRM console backend.
//!
//! Two halves share this crate:
//! - the `/api` proxy server (`routes`, `upstream`, `envelope`, `state`), run
//!   by the `neocrm` binary
//! - the console-side core (`session`, `api_client`): session bootstrap,
//!   tenant selection and typed calls to the proxy

pub mod api_client;
pub mod config;
pub mod envelope;
pub mod routes;
pub mod session;
pub mod state;
pub mod upstream;
