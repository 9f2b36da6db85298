//! Turns a raw `ureq` response into a `RestResponse`.

use ureq::http::Response;
use ureq::Body;

use crate::error::RestError;
use crate::http::RestResponse;

/// Reads the status and the whole body as text.
///
/// The body is read in full, without the engine's default size cap.
/// Non-2xx statuses are returned like any other. A failure while reading the
/// body means the server answered but the payload is unusable, so it is
/// always `RestError::ResultParsing`. The response is consumed here and
/// released on every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RestResponseHandler;

impl RestResponseHandler {
    pub fn handle_response(&self, mut response: Response<Body>) -> Result<RestResponse, RestError> {
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()
            .map_err(RestError::result_parsing)?;
        Ok(RestResponse::new(status, body))
    }
}
