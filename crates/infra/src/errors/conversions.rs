//! Conversions from external infrastructure errors into pipeline errors.

use courier_domain::NormalizedError;
use reqwest::Error as HttpError;
use url::ParseError as UrlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the pipeline error.
#[derive(Debug)]
pub struct InfraError(pub NormalizedError);

impl From<InfraError> for NormalizedError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<NormalizedError> for InfraError {
    fn from(value: NormalizedError) -> Self {
        InfraError(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → NormalizedError */
/* -------------------------------------------------------------------------- */

fn describe_http_error(err: &HttpError) -> &'static str {
    if err.is_timeout() {
        return "request timed out";
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if err.is_connect() {
            return "connection failed";
        }
    }
    if err.is_body() || err.is_decode() {
        "failed to read response body"
    } else if err.is_builder() {
        "request could not be built"
    } else if err.is_redirect() {
        "too many redirects"
    } else {
        "http request failed"
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        let mut error =
            NormalizedError::transport(format!("{}: {value}", describe_http_error(&value)));
        if let Some(status) = value.status() {
            error = error.with_status(status.as_u16());
        }
        InfraError(error.with_cause(value))
    }
}

/* -------------------------------------------------------------------------- */
/* url::ParseError → NormalizedError */
/* -------------------------------------------------------------------------- */

impl From<UrlError> for InfraError {
    fn from(value: UrlError) -> Self {
        InfraError(
            NormalizedError::transport(format!("invalid request URL: {value}")).with_cause(value),
        )
    }
}
