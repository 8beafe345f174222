use awsses_common::error::{ExporterError, Result};
use quick_xml::de::from_str as xml_from_str;
use serde::Deserialize;

use crate::types::SendDataPoint;

#[derive(Debug, Deserialize)]
#[serde(rename = "GetSendStatisticsResponse")]
struct GetSendStatisticsResponse {
    #[serde(rename = "GetSendStatisticsResult")]
    result: GetSendStatisticsResult,
}

#[derive(Debug, Default, Deserialize)]
struct GetSendStatisticsResult {
    #[serde(rename = "SendDataPoints", default)]
    send_data_points: SendDataPoints,
}

#[derive(Debug, Default, Deserialize)]
struct SendDataPoints {
    #[serde(rename = "member", default)]
    members: Vec<SendDataPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "ErrorResponse")]
struct ErrorResponse {
    #[serde(rename = "Error")]
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "Code")]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// Decodes the data points of a `GetSendStatistics` response in document order.
pub fn parse_send_statistics(xml: &str) -> Result<Vec<SendDataPoint>> {
    let response: GetSendStatisticsResponse = xml_from_str(xml).map_err(|err| {
        ExporterError::InvalidResponse(format!("invalid GetSendStatistics xml: {err}"))
    })?;
    Ok(response.result.send_data_points.members)
}

/// Extracts the structured error of a Query API `ErrorResponse`, if the body is one.
pub fn parse_error_response(xml: &str) -> Option<ExporterError> {
    let response: ErrorResponse = xml_from_str(xml).ok()?;
    Some(ExporterError::Service {
        code: response.error.code,
        message: response.error.message,
    })
}
