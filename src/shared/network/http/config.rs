use anyhow::{Error as AnyhowError, Result};
use clap::Args;
use cookie::Cookie;
use reqwest::header::{COOKIE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use reqwest::{Proxy, redirect::Policy};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Args, Debug, Clone)]
pub struct HttpArgs {
    ///Maximum http redirects this application will follow if need be.
    #[arg(long, env = "SPLITFETCH_MAX_REDIRECTS")]
    pub max_redirects: Option<usize>,
    /// Seconds to wait for a connection, or for the next bytes of a response.
    /// A slow download that keeps receiving data never times out.
    #[arg(short = 'T', long, env = "SPLITFETCH_TIMEOUT", default_value_t = 60)]
    pub timeout: u64,
    ///Only http proxies are supported currently.
    #[arg(short = 'p', long, env = "SPLITFETCH_PROXY")]
    pub proxy_url: Option<String>,
    /// Use a column seperated key value pair e.g key1:value1,key2:value2 for request headers.
    #[arg(long)]
    pub request_headers: Option<String>,
    /// Add http cookies from previous http session.
    #[arg(long)]
    pub http_cookies: Option<String>,
    /// Set http version,supports up to  http version 1.1.
    #[arg(long)]
    pub http_version: Option<String>,
}

impl Default for HttpArgs {
    fn default() -> Self {
        Self {
            max_redirects: None,
            timeout: 60,
            proxy_url: None,
            request_headers: None,
            http_cookies: None,
            http_version: None,
        }
    }
}

impl TryFrom<HttpArgs> for reqwest::Client {
    type Error = AnyhowError;

    /// Tries to convert an `HttpArgs` into a `reqwest::Client`.
    fn try_from(http_config: HttpArgs) -> Result<Self, Self::Error> {
        build_client(http_config)
    }
}

/// Parse `key1:value1,key2:value2` into a header map, skipping pairs without a colon.
fn parse_request_headers(request_headers_str: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for header in request_headers_str.split(',').map(str::trim) {
        if let Some((name, value)) = header.split_once(':') {
            headers.insert(
                HeaderName::from_str(name.trim())?,
                HeaderValue::from_str(value.trim())?,
            );
        } else if !header.is_empty() {
            warn!(header, "Ignoring request header without a ':' separator.");
        }
    }
    Ok(headers)
}

fn build_client(http_config: HttpArgs) -> Result<Client, AnyhowError> {
    let mut client_config = ClientBuilder::new();
    info!("Initialized client builder.");

    let policy: Policy = if let Some(max_redirects) = http_config.max_redirects {
        info!("Maximum redirect has been set to {}", max_redirects);
        Policy::limited(max_redirects)
    } else {
        info!("Maximum redirect still default");
        Policy::default()
    };

    let timeout = {
        info!("Setting connect and read timeout to {}.", http_config.timeout);
        Duration::from_secs(http_config.timeout)
    };

    // Per connect and per read, never for a whole request.
    client_config = client_config
        .connect_timeout(timeout)
        .read_timeout(timeout)
        .redirect(policy);

    if let Some(proxy_url) = http_config.proxy_url {
        info!("Setting up user-defined proxy.");
        client_config = client_config.proxy(Proxy::all(proxy_url)?);
    } else {
        info!("No user defined proxy.");
        client_config = client_config.no_proxy();
    }

    if let Some(http_version) = http_config.http_version {
        if http_version.as_str() != "1.1" {
            warn!("Unsupported http version {http_version}, using http version 1.1.");
        }
        client_config = client_config.http1_only();
    }

    let mut request_header_headermap = match http_config.request_headers {
        Some(request_headers_str) => {
            info!("Setting up user-defined HTTP headers.");
            parse_request_headers(&request_headers_str)?
        }
        None => HeaderMap::new(),
    };

    if let Some(cookies_str) = http_config.http_cookies {
        info!("Setting up user-defined HTTP cookies.");
        match Cookie::parse(cookies_str) {
            Ok(cookie) => {
                request_header_headermap
                    .insert(COOKIE, HeaderValue::from_str(cookie.to_string().as_ref())?);
            }
            Err(err) => {
                error!(error = %err, "Can't sanitize cookie");
            }
        }
    }

    let client = client_config
        .default_headers(request_header_headermap)
        .build()?;
    info!("Built HTTP client with User configuration");
    Ok(client)
}
