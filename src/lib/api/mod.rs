//! Module containing everything pertaining to submitting records to the API.
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use thiserror::Error;
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, instrument, warn};

use self::{
    request::{DimensionSubmission, ServerSubmission, Submission, DIMENSIONS_PATH, SERVERS_PATH},
    response::{ErrorEvent, LoadEvent, Outcome, Report},
};

pub mod request;
pub mod response;

/// An error type for everything that may go wrong while submitting.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("No tokio runtime is available to dispatch requests on")]
    NoRuntime,
    #[error("Request could not be completed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Dispatches submissions to the API rooted at an explicit base URL.
///
/// Every dispatch runs as its own task and returns without waiting for the
/// request. Nothing is ordered between dispatches.
#[derive(Debug, Clone)]
pub struct Submitter {
    client: Client,
    base_url: String,
    runtime: Handle,
}

impl Submitter {
    /// Creates a [`Submitter`] on the current tokio runtime.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SubmitError> {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a [`Submitter`] that sends through the given client.
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Result<Self, SubmitError> {
        let runtime = Handle::try_current().map_err(|_| SubmitError::NoRuntime)?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();

        Ok(Self {
            client,
            base_url,
            runtime,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The full URL for an endpoint path such as `/api/servers`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submits a new server record.
    pub fn add_server(
        &self,
        name: impl Into<String>,
        ip: impl Into<String>,
        reporter: impl Report,
    ) -> JoinHandle<()> {
        self.dispatch(ServerSubmission::new(name, ip), reporter)
    }

    /// Submits a new dimension record that references `server` by name.
    pub fn add_dimension(
        &self,
        name: impl Into<String>,
        alias: impl Into<String>,
        server: impl Into<String>,
        reporter: impl Report,
    ) -> JoinHandle<()> {
        self.dispatch(DimensionSubmission::new(name, alias, server), reporter)
    }

    pub fn list_servers(&self, reporter: impl Report) -> JoinHandle<()> {
        self.dispatch_fetch(SERVERS_PATH, reporter)
    }

    pub fn list_dimensions(&self, reporter: impl Report) -> JoinHandle<()> {
        self.dispatch_fetch(DIMENSIONS_PATH, reporter)
    }

    /// Spawns the submission and hands its outcome to `reporter` once the
    /// request completes.
    pub fn dispatch<S: Submission>(&self, submission: S, reporter: impl Report) -> JoinHandle<()> {
        let submitter = self.clone();

        self.runtime
            .spawn(async move { reporter.report(submitter.submit(submission).await) })
    }

    fn dispatch_fetch(&self, path: &'static str, reporter: impl Report) -> JoinHandle<()> {
        let submitter = self.clone();

        self.runtime
            .spawn(async move { reporter.report(submitter.fetch(path).await) })
    }

    /// Posts the submission as a multipart form and waits for its outcome.
    #[instrument(skip(self, submission))]
    pub async fn submit<S: Submission>(&self, submission: S) -> Outcome {
        let url = self.endpoint(S::PATH);

        debug!("submitting form to {:?}", url);

        let request = self.client.post(&url).multipart(submission.into_form());

        execute(url, request).await
    }

    /// Fetches an endpoint and waits for its outcome. The body is not parsed.
    #[instrument(skip(self))]
    pub async fn fetch(&self, path: &'static str) -> Outcome {
        let url = self.endpoint(path);

        debug!("fetching {:?}", url);

        let request = self.client.get(&url);

        execute(url, request).await
    }
}

/// Sends the request and turns whatever happens into an [`Outcome`].
async fn execute(url: String, request: RequestBuilder) -> Outcome {
    let dispatched_at = Utc::now();

    match receive(request).await {
        Ok((status, body)) => {
            debug!("received {} from {:?}", status, url);

            Outcome::Load(LoadEvent {
                url,
                status,
                body,
                dispatched_at,
                completed_at: Utc::now(),
            })
        }
        Err(error) => {
            warn!("request to {:?} failed: {}", url, error);

            Outcome::Error(ErrorEvent {
                url,
                error,
                dispatched_at,
                completed_at: Utc::now(),
            })
        }
    }
}

/// A failure while reading the body is a transport failure as well.
async fn receive(request: RequestBuilder) -> Result<(StatusCode, String), SubmitError> {
    let res = request.send().await?;
    let status = res.status();
    let body = res.text().await?;

    Ok((status, body))
}
