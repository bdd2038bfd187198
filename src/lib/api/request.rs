//! This module declares all payloads that may be submitted to the API.
use reqwest::multipart::Form;

/// The endpoint servers are submitted to and listed from.
pub const SERVERS_PATH: &str = "/api/servers";

/// The endpoint dimensions are submitted to and listed from.
pub const DIMENSIONS_PATH: &str = "/api/dims";

/// A payload that is posted to the API as a multipart form.
pub trait Submission: Send + 'static {
    /// The endpoint path, relative to the base URL.
    const PATH: &'static str;

    /// The form fields, in the order they are sent.
    fn fields(&self) -> Vec<(&'static str, String)>;

    /// Builds the multipart form. Values are sent exactly as given.
    fn into_form(self) -> Form
    where
        Self: Sized,
    {
        self.fields()
            .into_iter()
            .fold(Form::new(), |form, (key, value)| form.text(key, value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSubmission {
    pub name: String,
    pub ip: String,
}

impl ServerSubmission {
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
        }
    }
}

impl Submission for ServerSubmission {
    const PATH: &'static str = SERVERS_PATH;

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![("name", self.name.clone()), ("ip", self.ip.clone())]
    }
}

/// A dimension record. `server` names the server it belongs to and is not
/// checked against existing records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSubmission {
    pub name: String,
    pub alias: String,
    pub server: String,
}

impl DimensionSubmission {
    pub fn new(
        name: impl Into<String>,
        alias: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            alias: alias.into(),
            server: server.into(),
        }
    }
}

impl Submission for DimensionSubmission {
    const PATH: &'static str = DIMENSIONS_PATH;

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("alias", self.alias.clone()),
            ("server", self.server.clone()),
        ]
    }
}
