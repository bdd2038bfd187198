//! Submits server and dimension records to a map backend's REST API.
pub mod api;
pub mod config;

pub use api::{
    request::{DimensionSubmission, ServerSubmission, Submission},
    response::{ErrorEvent, LoadEvent, LogReport, Outcome, Report},
    SubmitError, Submitter,
};
