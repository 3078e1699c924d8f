//! Retrieval of the feeds a run works on.
//!
//! A [FeedSource] turns a URL into either the raw lines of the body (route
//! dumps, VRP exports) or its CSV records (the IANA registries). Nothing
//! beyond splitting is done here; the stages parse the lines and records
//! themselves. Bodies of URLs ending in `.gz` are gunzipped on the fly.

use std::io::{BufRead, BufReader, Read};

use flate2::read::GzDecoder;
use log::{debug, info};

use crate::errors::FetchError;

//------------ FeedSource ----------------------------------------------------

pub trait FeedSource: Send + Sync {
    /// All lines of the body at `url`, without line terminators.
    fn fetch_lines(&self, url: &str) -> Result<Vec<String>, FetchError>;

    /// All CSV records of the body at `url`, the header row included.
    fn fetch_table(
        &self,
        url: &str,
    ) -> Result<Vec<csv::StringRecord>, FetchError>;
}

//------------ HttpFetcher ---------------------------------------------------

/// Fetches `http://` and `https://` URLs over the network, and `file://`
/// URLs from the local file system.
#[derive(Clone, Debug, Default)]
pub struct HttpFetcher {
    user_agent: Option<String>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: Some(user_agent.into()),
        }
    }

    fn open(&self, url: &str) -> Result<Box<dyn Read + Send>, FetchError> {
        info!("fetching {}", url);
        let body: Box<dyn Read + Send> =
            if url.starts_with("http://") || url.starts_with("https://") {
                let mut request = ureq::get(url);
                if let Some(agent) = &self.user_agent {
                    request = request.set("User-Agent", agent);
                }
                let response =
                    request.call().map_err(|e| FetchError::Transport {
                        url: url.to_string(),
                        reason: e.to_string(),
                    })?;
                debug!(
                    "{}: {} {}",
                    url,
                    response.status(),
                    response.status_text()
                );
                Box::new(response.into_reader())
            } else if let Some(path) = url.strip_prefix("file://") {
                let file = std::fs::File::open(path).map_err(|source| {
                    FetchError::Io {
                        url: url.to_string(),
                        source,
                    }
                })?;
                Box::new(file)
            } else {
                return Err(FetchError::UnsupportedUrl(url.to_string()));
            };

        Ok(decompress(url, body))
    }
}

impl FeedSource for HttpFetcher {
    fn fetch_lines(&self, url: &str) -> Result<Vec<String>, FetchError> {
        read_lines(url, self.open(url)?)
    }

    fn fetch_table(
        &self,
        url: &str,
    ) -> Result<Vec<csv::StringRecord>, FetchError> {
        read_table(url, self.open(url)?)
    }
}

//------------ Readers -------------------------------------------------------

/// Wrap the body of `url` in a gzip decoder if the URL says it is
/// compressed.
pub fn decompress<'a>(
    url: &str,
    body: Box<dyn Read + Send + 'a>,
) -> Box<dyn Read + Send + 'a> {
    if url.ends_with(".gz") {
        Box::new(GzDecoder::new(body))
    } else {
        body
    }
}

/// Split a body into lines. Bytes that are not valid UTF-8 are replaced,
/// rather than failing the whole feed.
pub fn read_lines(
    url: &str,
    body: impl Read,
) -> Result<Vec<String>, FetchError> {
    let mut reader = BufReader::new(body);
    let mut lines = vec![];
    let mut buf = vec![];
    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).map_err(|source| {
            FetchError::Io {
                url: url.to_string(),
                source,
            }
        })?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        lines.push(line.trim_end_matches(['\n', '\r']).to_string());
    }
    debug!("{}: {} lines", url, lines.len());
    Ok(lines)
}

/// Read all CSV records of a body. Records may have differing numbers of
/// fields.
pub fn read_table(
    url: &str,
    body: impl Read,
) -> Result<Vec<csv::StringRecord>, FetchError> {
    let records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body)
        .into_records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| FetchError::Csv {
            url: url.to_string(),
            source,
        })?;
    debug!("{}: {} records", url, records.len());
    Ok(records)
}
