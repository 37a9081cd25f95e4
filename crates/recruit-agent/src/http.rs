use reqwest::{Response, StatusCode};

/// Passes successful responses through, otherwise reads the body so it
/// can be reported along with the status.
pub(crate) async fn check_status(
    response: Response,
) -> Result<Response, (StatusCode, String)> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            debug!("failed to read error body: {err}");
            String::new()
        }
    };
    Err((status, body))
}
