//! Starts the candidate-generation notebook on the orchestration platform.
//!
//! A request is validated into [`TriggerParameters`], a bearer token is
//! obtained through the client-credentials grant ([`TokenSource`]), and the
//! run is submitted through a [`NotebookLauncher`]. Both outbound calls sit
//! behind traits so the service can be driven without a network.

mod client;
mod request;
mod service;
mod token;

pub use client::{FabricNotebookClient, NotebookLauncher, NotebookTarget, UpstreamResponse};
pub use request::TriggerParameters;
pub use service::{NotebookTriggerService, TriggerError, TriggerReceipt, ACCEPTED_STATUSES};
pub use token::{AccessToken, ClientCredentials, EntraTokenProvider, TokenSource};
