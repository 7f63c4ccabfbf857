//! Response envelope shared by all JSON endpoints

use serde::Serialize;

pub const STATUS_SUCCESS: &str = "success";
pub const STATUS_FAIL: &str = "fail";

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: STATUS_SUCCESS,
            message: Some(message.into()),
            data,
        }
    }

    pub fn data(data: T) -> Self {
        Self {
            status: STATUS_SUCCESS,
            message: None,
            data,
        }
    }
}

/// Body of every failed request
#[derive(Debug, Serialize)]
pub struct Failure {
    pub status: &'static str,
    pub message: String,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAIL,
            message: message.into(),
        }
    }
}
