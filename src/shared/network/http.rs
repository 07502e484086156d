use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, HeaderValue, RANGE};
use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::shared::errors::SplitFetchError;
use crate::shared::network::{BoxedStream, RangeTransport};
use crate::shared::split_parts::ByteRange;

pub mod config;

use config::HttpArgs;

/// http client wrapper for reqwest library.
///
/// The client never retries; a failed request fails the whole download.
#[derive(Clone)]
pub struct HttpAdapter {
    client: ClientWithMiddleware,
}

impl HttpAdapter {
    #[instrument(name = "new_http_adapter")]
    pub fn new(http_args: HttpArgs) -> Result<Self> {
        let try_client = Client::try_from(http_args)
            .context("Can't create http client due to misconfiguration.")?;
        Ok(Self::from_client(try_client))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client) -> Self {
        let client: ClientWithMiddleware = ClientBuilder::new(client)
            .with(TracingMiddleware::default()) // Enable built-in http client tracing and logging.
            .build();
        Self { client }
    }
}

/// Parse a `Content-Length` header value into a byte count.
fn parse_content_length(source: &Url, header: Option<&HeaderValue>) -> Result<u64, SplitFetchError> {
    let Some(header) = header else {
        warn!(
            name = "no_download_size",
            "Can't get download size for url {} ,in http header Content-Length", source
        );
        return Err(SplitFetchError::MissingSize { url: source.clone() });
    };

    let invalid = || SplitFetchError::InvalidSize {
        url: source.clone(),
        value: String::from_utf8_lossy(header.as_bytes()).into_owned(),
    };
    let value = header.to_str().map_err(|_| invalid())?.trim();
    // u64::from_str accepts a leading '+', which is not a valid Content-Length.
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    value.parse::<u64>().map_err(|_| invalid())
}

/// Check that a `206` carries `Content-Range: bytes <start>-<end-1>/<total>`
/// for exactly the requested `range`.
fn check_content_range(
    source: &Url,
    range: ByteRange,
    header: Option<&HeaderValue>,
) -> Result<(), SplitFetchError> {
    let content_range = header
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
        .unwrap_or_default();
    let served = content_range
        .trim()
        .strip_prefix("bytes ")
        .and_then(|value| value.split_once('/'))
        .and_then(|(span, _total)| span.split_once('-'))
        .and_then(|(first, last)| Some((first.trim().parse::<u64>().ok()?, last.trim().parse::<u64>().ok()?)));

    match served {
        Some((first, last)) if first == *range.start() && last + 1 == *range.end() => Ok(()),
        _ => Err(SplitFetchError::ContentRangeMismatch {
            url: source.clone(),
            range,
            content_range,
        }),
    }
}

#[async_trait]
impl RangeTransport for HttpAdapter {
    #[instrument(name = "reqwest_total_bytes", skip(self), fields(url = source.as_str()))]
    async fn total_bytes(&self, source: &Url) -> Result<u64, SplitFetchError> {
        debug!("Sending HEAD request for {source}.");
        let resp = self
            .client
            .head(source.clone())
            .send()
            .await
            .map_err(|source_err| SplitFetchError::Transport {
                url: source.clone(),
                source: source_err,
            })?;

        if !resp.status().is_success() {
            return Err(SplitFetchError::ResolveStatus {
                url: source.clone(),
                status: resp.status(),
            });
        }

        let size = parse_content_length(source, resp.headers().get(CONTENT_LENGTH))?;
        info!(name = "download_size_ready", size, "Got download size.");
        Ok(size)
    }

    #[instrument(name = "reqwest_fetch_range", skip(self), fields(url = source.as_str(), range = %range))]
    async fn fetch_range(&self, source: &Url, range: ByteRange) -> Result<BoxedStream, SplitFetchError> {
        let Some(range_header) = range.header_value() else {
            debug!("Empty range, nothing to request.");
            return Ok(Box::pin(stream::empty::<Result<Bytes, SplitFetchError>>()));
        };

        debug!(
            name = "initialize_multipart_response",
            "Requesting {range_header}."
        );
        let resp = self
            .client
            .get(source.clone())
            .header(RANGE, range_header)
            .send()
            .await
            .map_err(|err| SplitFetchError::Request {
                url: source.clone(),
                range,
                source: err,
            })?;

        // A 200 means the server ignored the range and is sending the whole body.
        if resp.status() != StatusCode::PARTIAL_CONTENT {
            warn!(status = %resp.status(), "Server did not honour the range request.");
            return Err(SplitFetchError::UnexpectedStatus {
                url: source.clone(),
                range,
                status: resp.status(),
            });
        }

        if let Err(err) = check_content_range(source, range, resp.headers().get(CONTENT_RANGE)) {
            warn!(error = %err, "Server sent a different span than requested.");
            return Err(err);
        }

        info!(
            name = "successful_multipart_response",
            "Multipart response successful, getting response chunks."
        );
        let url = source.clone();
        let body = stream::try_unfold(resp, move |mut resp| {
            let url = url.clone();
            async move {
                match resp.chunk().await {
                    Ok(Some(bytes)) => Ok(Some((bytes, resp))),
                    Ok(None) => Ok(None),
                    Err(err) => Err(SplitFetchError::Body { url, range, source: err }),
                }
            }
        });
        Ok(Box::pin(body))
    }
}
