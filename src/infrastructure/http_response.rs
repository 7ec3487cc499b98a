// HTTP response utilities for spreadsheet downloads
use axum::{
    body::Body,
    http::{header, HeaderValue, Response, StatusCode},
};
use bytes::Bytes;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Wrap a rendered workbook as a file download
pub fn xlsx_attachment_response(
    data: Vec<u8>,
    filename: &str,
) -> Result<Response<Body>, StatusCode> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| {
            tracing::error!("Invalid report filename {:?}: {}", filename, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let body = Bytes::from(data);
    tracing::debug!("Sending report {} ({} bytes)", filename, body.len());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, XLSX_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body))
        .map_err(|e| {
            tracing::error!("Response build error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
