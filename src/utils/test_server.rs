//! In-process HTTP server for exercising range downloads in tests.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::head,
};
use futures::{StreamExt, stream};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthHeader {
    Exact,
    Missing,
    /// `Content-Length: not-a-number`.
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    Honor,
    /// Answer ranged requests with `200 OK` and the whole body.
    Ignore,
    /// Answer with `206` and the right length, but always from offset 0.
    FromStart,
}

/// The resource served by a [`MockServer`] and how it misbehaves.
#[derive(Debug, Clone)]
pub struct MockResource {
    body: Bytes,
    length_header: LengthHeader,
    range_mode: RangeMode,
    fail_range_at: Option<u64>,
    delay: Duration,
    oversend: bool,
    trickle: Option<(usize, Duration)>,
}

impl MockResource {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body: Bytes::from(body),
            length_header: LengthHeader::Exact,
            range_mode: RangeMode::Honor,
            fail_range_at: None,
            delay: Duration::ZERO,
            oversend: false,
            trickle: None,
        }
    }

    pub fn length_header(mut self, value: LengthHeader) -> Self {
        self.length_header = value;
        self
    }

    pub fn range_mode(mut self, value: RangeMode) -> Self {
        self.range_mode = value;
        self
    }

    /// Answer `500` straight away to the range starting at `start`.
    pub fn fail_range_at(mut self, start: u64) -> Self {
        self.fail_range_at = Some(start);
        self
    }

    /// Wait before answering every successful range request.
    pub fn delay(mut self, value: Duration) -> Self {
        self.delay = value;
        self
    }

    /// Append one `0xFF` byte past the requested range to every `206` body.
    pub fn oversend(mut self, value: bool) -> Self {
        self.oversend = value;
        self
    }

    /// Send `206` bodies `piece` bytes at a time, `interval` apart.
    pub fn trickle(mut self, piece: usize, interval: Duration) -> Self {
        self.trickle = Some((piece.max(1), interval));
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicUsize,
    served_ranges: AtomicUsize,
}

#[derive(Clone)]
struct AppState {
    resource: Arc<MockResource>,
    counters: Arc<Counters>,
}

pub struct MockServer {
    url: Url,
    counters: Arc<Counters>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(resource: MockResource) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let url = Url::parse(&format!("http://{addr}/resource.bin"))?;
        let counters = Arc::new(Counters::default());

        let app = Router::new()
            .route("/resource.bin", head(handle_head).get(handle_get))
            .with_state(AppState {
                resource: Arc::new(resource),
                counters: counters.clone(),
            });
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                warn!(error = %err, "Mock server stopped.");
            }
        });

        Ok(Self {
            url,
            counters,
            handle,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Requests received, of any method.
    pub fn requests(&self) -> usize {
        self.counters.requests.load(Ordering::SeqCst)
    }

    /// `206` responses sent. Counted before the body goes out.
    pub fn served_ranges(&self) -> usize {
        self.counters.served_ranges.load(Ordering::SeqCst)
    }

    /// Stop accepting connections and release the port.
    pub async fn shutdown(mut self) {
        self.handle.abort();
        let _ = (&mut self.handle).await;
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_head(State(state): State<AppState>) -> Response {
    state.counters.requests.fetch_add(1, Ordering::SeqCst);
    debug!("Mock server received HEAD.");
    let body_len = state.resource.body.len();
    match state.resource.length_header {
        LengthHeader::Exact => (StatusCode::OK, [(header::CONTENT_LENGTH, body_len.to_string())]).into_response(),
        LengthHeader::Invalid => (StatusCode::OK, [(header::CONTENT_LENGTH, "not-a-number")]).into_response(),
        LengthHeader::Missing => {
            // A body of unknown size leaves Content-Length unset.
            let body = Body::from_stream(stream::empty::<Result<Bytes, std::io::Error>>());
            (StatusCode::OK, body).into_response()
        }
    }
}

async fn handle_get(headers: HeaderMap, State(state): State<AppState>) -> Response {
    state.counters.requests.fetch_add(1, Ordering::SeqCst);
    let resource = state.resource.as_ref();
    let body_len = resource.body.len() as u64;
    let range = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_range(value, body_len));
    debug!(range = ?range, "Mock server received GET.");

    let Some((start, end)) = range else {
        return (StatusCode::OK, resource.body.clone()).into_response();
    };
    if resource.fail_range_at == Some(start) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if resource.range_mode == RangeMode::Ignore {
        return (StatusCode::OK, resource.body.clone()).into_response();
    }

    tokio::time::sleep(resource.delay).await;
    if start >= body_len || start > end {
        return (
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(header::CONTENT_RANGE, format!("bytes */{body_len}"))],
        )
            .into_response();
    }

    let end = end.min(body_len - 1);
    let (first, last) = match resource.range_mode {
        RangeMode::FromStart => (0, end - start),
        _ => (start, end),
    };
    let mut slice = resource.body.slice(first as usize..=last as usize).to_vec();
    if resource.oversend {
        slice.push(0xFF);
    }
    let body = match resource.trickle {
        Some((piece, interval)) => trickle_body(slice, piece, interval),
        None => Body::from(slice),
    };

    state.counters.served_ranges.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::PARTIAL_CONTENT,
        [(header::CONTENT_RANGE, format!("bytes {first}-{last}/{body_len}"))],
        body,
    )
        .into_response()
}

/// Parse `bytes=<start>-<end>` into an inclusive pair; a missing end means "to the last byte".
fn parse_range(value: &str, body_len: u64) -> Option<(u64, u64)> {
    let (start, end) = value.trim().strip_prefix("bytes=")?.split_once('-')?;
    let start = start.trim().parse().ok()?;
    let end = match end.trim() {
        "" => body_len.checked_sub(1)?,
        end => end.parse().ok()?,
    };
    Some((start, end))
}

fn trickle_body(data: Vec<u8>, piece: usize, interval: Duration) -> Body {
    let pieces: Vec<Bytes> = data.chunks(piece).map(Bytes::copy_from_slice).collect();
    let pieces = stream::iter(pieces.into_iter().enumerate()).then(move |(index, piece)| async move {
        if index > 0 {
            tokio::time::sleep(interval).await;
        }
        Ok::<_, std::io::Error>(piece)
    });
    Body::from_stream(pieces)
}
