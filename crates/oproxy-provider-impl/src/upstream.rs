use std::io;

use futures_util::StreamExt;

use oproxy_provider_core::{RelayError, UpstreamBody, UpstreamResponse};

pub fn network_failure(err: wreq::Error) -> RelayError {
    RelayError::Upstream(err.to_string())
}

pub fn handle_response(response: wreq::Response) -> UpstreamResponse {
    let status = response.status();
    let headers = response.headers().clone();
    let stream = response
        .bytes_stream()
        .map(|item| item.map_err(|err| io::Error::other(err.to_string())));
    UpstreamResponse {
        status,
        headers,
        body: UpstreamBody::new(stream),
    }
}

pub fn build_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
