use std::{collections::HashMap, io, time::Duration};

use reqwest::{
    blocking::{Client, Response},
    header::LOCATION,
    redirect, StatusCode,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::utils;

const USER_AGENT: &str = concat!("weblaunch/", env!("CARGO_PKG_VERSION"));

/// Settings for a single fetch. The defaults are what [`read_url`] uses.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// How long to wait for each connection to be established.
    pub connect_timeout: Duration,
    /// How long to wait for each response, body included.
    pub read_timeout: Duration,
    /// How many times the same URL may be requested before the redirect chain
    /// is considered a loop.
    pub max_visits: u32,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(15),
            max_visits: 3,
            user_agent: USER_AGENT.to_owned(),
        }
    }
}

/// The outcome of following a redirect chain to its end.
#[derive(Debug, Clone, Serialize)]
pub struct Fetched {
    /// The URL the body was read from.
    pub url: Url,
    pub status: u16,
    /// Every URL the chain was redirected to, in order. Empty if the first
    /// response was final.
    pub redirects: Vec<Url>,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid URL {url:?}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("stuck in redirect loop at {url}")]
    RedirectLoop { url: Url },
    #[error("redirect from {url} has no usable Location header")]
    MissingLocation { url: Url },
    #[error("cannot follow redirect to {location:?}")]
    InvalidLocation {
        location: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("request to {url} failed with status {status}")]
    Status { url: Url, status: StatusCode },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<FetchError> for io::Error {
    fn from(err: FetchError) -> Self {
        let kind = match &err {
            FetchError::Http(e) if e.is_timeout() => io::ErrorKind::TimedOut,
            FetchError::InvalidUrl { .. } => io::ErrorKind::InvalidInput,
            FetchError::RedirectLoop { .. }
            | FetchError::MissingLocation { .. }
            | FetchError::InvalidLocation { .. } => io::ErrorKind::InvalidData,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Reads the text at `url`, following redirects with the default
/// [`FetchOptions`]. Every line of the returned text ends with `\n`.
pub fn read_url(url: &str) -> Result<String, FetchError> {
    fetch(url, &FetchOptions::default()).map(|fetched| fetched.body)
}

/// Fetches `url`, following redirects by hand so that every hop is counted
/// and relative `Location` headers resolve against the URL that sent them.
pub fn fetch(url: &str, options: &FetchOptions) -> Result<Fetched, FetchError> {
    let mut current = Url::parse(url)
        .map_err(|source| FetchError::InvalidUrl { url: url.to_owned(), source })?;

    let client = Client::builder()
        .user_agent(options.user_agent.as_str())
        .connect_timeout(options.connect_timeout)
        .timeout(options.read_timeout)
        .redirect(redirect::Policy::none())
        .build()?;

    let mut visited: HashMap<Url, u32> = HashMap::new();
    let mut redirects = Vec::new();

    let response = loop {
        let times = {
            let count = visited.entry(current.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if times > options.max_visits {
            warn!("{} was reached {} times; giving up", current, times);
            return Err(FetchError::RedirectLoop { url: current });
        }

        debug!("Requesting {} (visit {})", current, times);
        let response = client.get(current.clone()).send()?;
        let status = response.status();
        if !is_followed_redirect(status) {
            break response;
        }

        let next = redirect_target(&current, &response)?;
        trace!("{} redirected with {} to {}", current, status, next);
        redirects.push(next.clone());
        current = next;
    };

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        return Err(FetchError::Status { url: current, status });
    }

    let body = utils::terminate_lines(&response.text()?);
    info!("Read {} bytes from {}", body.len(), current);
    Ok(Fetched { url: current, status: status.as_u16(), redirects, body })
}

fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn redirect_target(current: &Url, response: &Response) -> Result<Url, FetchError> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| FetchError::MissingLocation { url: current.clone() })?;

    let decoded = utils::decode_location(location).map_err(|e| FetchError::InvalidLocation {
        location: location.to_owned(),
        source: e.into(),
    })?;

    current.join(&decoded).map_err(|e| FetchError::InvalidLocation {
        location: location.to_owned(),
        source: e.into(),
    })
}
