//! Convergence polling for end-to-end tests.
//!
//! A [`ConvergencePoller`] creates a set of resources through a
//! [`ResourceClient`], repeatedly asks a [`StatusProbe`] how the workload under
//! test is doing, classifies the answer into an [`Outcome`] and always tears
//! the created resources down again.

pub use cleanup::CleanupStack;
pub use cleanup::with_cleanup;
pub use client::ResourceClient;
pub use client::StatusProbe;
pub use config::DEFAULT_NAMESPACE;
pub use config::PollConfig;
pub use config::TestContext;
pub use outcome::ConvergenceFailure;
pub use outcome::Diagnostic;
pub use outcome::Failure;
pub use outcome::Observation;
pub use outcome::Outcome;
pub use outcome::PollAttempt;
pub use outcome::RunReport;
pub use outcome::TeardownAction;
pub use outcome::TeardownFailure;
pub use poll::PollTimeout;
pub use poll::poll_until;
pub use poller::ConvergencePoller;
pub use resource::LabelSelector;
pub use resource::ManagedResource;
pub use resource::ResourceKind;
pub use resource::ResourceRef;
pub use status::ProbeQuery;
pub use status::Status;

mod cleanup;
mod client;
mod config;
mod outcome;
mod poll;
mod poller;
mod resource;
mod status;
