//! HTTP Helpers
//!
//! Thin fetch() wrappers for the forum's AJAX endpoints.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestCredentials, RequestInit, Response};

use leptos_sortable::{OrderTransport, PersistRequest, TransportError};

use crate::error::{AssetError, AssetResult};

/// application/x-www-form-urlencoded unreserved characters
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

pub fn encode_form(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, FORM_ENCODE_SET),
                utf8_percent_encode(value, FORM_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

async fn send(method: &str, url: &str, body: Option<String>) -> AssetResult<Response> {
    let init = RequestInit::new();
    init.set_method(method);
    init.set_credentials(RequestCredentials::SameOrigin);

    let headers = Headers::new()?;
    headers.set("X-Requested-With", "XMLHttpRequest")?;
    if let Some(body) = body {
        headers.set("Content-Type", "application/x-www-form-urlencoded; charset=UTF-8")?;
        init.set_body(&JsValue::from_str(&body));
    }
    init.set_headers(&headers);

    let request = Request::new_with_str_and_init(url, &init)?;
    let window = web_sys::window().ok_or_else(|| AssetError::Js("no window".to_string()))?;
    let response = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| AssetError::Network(format!("{:?}", e)))?;
    let response: Response = response.dyn_into()?;

    if !response.ok() {
        return Err(AssetError::Status(response.status()));
    }
    Ok(response)
}

async fn body_text(response: Response) -> AssetResult<String> {
    let text = JsFuture::from(response.text()?).await?;
    Ok(text.as_string().unwrap_or_default())
}

pub async fn get_text(url: &str) -> AssetResult<String> {
    body_text(send("GET", url, None).await?).await
}

pub async fn get_json<T: DeserializeOwned>(url: &str) -> AssetResult<T> {
    let text = get_text(url).await?;
    Ok(serde_json::from_str(&text)?)
}

/// POST form fields; returns the response body
pub async fn post_form(url: &str, fields: &[(String, String)]) -> AssetResult<String> {
    body_text(send("POST", url, Some(encode_form(fields))).await?).await
}

/// Order endpoint transport for sortable lists
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchTransport;

impl OrderTransport for FetchTransport {
    async fn send(&self, request: &PersistRequest) -> Result<(), TransportError> {
        post_form(&request.url, &request.form_fields())
            .await
            .map(|_| ())
            .map_err(TransportError::from)
    }
}

impl From<AssetError> for TransportError {
    fn from(e: AssetError) -> Self {
        match e {
            AssetError::Status(code) => TransportError::Status(code),
            AssetError::Network(msg) => TransportError::Network(msg),
            other => TransportError::Request(other.to_string()),
        }
    }
}
