use clap::Args;
use std::path::PathBuf;
use url::Url;

use crate::shared::network::http::config::HttpArgs;

#[derive(Clone, Debug, Args)]
pub struct LocalArgs {
    ///Http url of file to download.
    #[arg(short = 'u', long, value_parser = parse_url)]
    pub url: Url,
    ///Path to save download, an existing file is overwritten.
    #[arg(short = 'o', long, value_parser = parse_output_path)]
    pub output: PathBuf,
    ///Number of byte ranges fetched concurrently.
    #[arg(short = 'w', long, env = "SPLITFETCH_WORKERS", default_value_t = 4, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: u64,
    #[command(flatten)]
    pub http_args: HttpArgs,
}

///Perform path validation with this function,if path is a dir,
/// this function will throw an Err,else it will return the path.
fn parse_output_path(path: &str) -> Result<PathBuf, String> {
    let to_path = PathBuf::from(path);
    if to_path.is_dir() {
        return Err(format!("{path} is a directory and not a path to a file."));
    }
    if to_path.file_name().is_none() {
        return Err(format!("{path} has no file name."));
    }
    Ok(to_path)
}

///This method takes a url as a string literal,checks and validate http
/// scheme in the url,parses it and return a Result Url or String
/// type if any error occur.
fn parse_url(url: &str) -> Result<Url, String> {
    if url.starts_with("https://") || url.starts_with("http://") {
        return Url::parse(url).map_err(|e| format!("Invalid Url {url} {e}"));
    }
    let new_url = format!("https://{url}");
    Url::parse(&new_url).map_err(|e| format!("Invalid Url {url} {e}"))
}
