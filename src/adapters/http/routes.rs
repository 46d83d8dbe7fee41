//! warp filters for both workflow variants.
//!
//! ```text
//! GET  /{root}                    configuration form model
//! POST /{root}                    submit configuration
//! POST /{root}/get-data-to-sign   JSON {signingCertificate, certificateChain, encryptionAlgorithm}
//! POST /{root}/sign-document      JSON {signatureValue}
//! GET  /{root}/download           signed document as attachment
//! ```
//!
//! `{root}` is `sign-a-digest` (url-encoded form) or
//! `sign-multiple-documents` (multipart form with `documentsToSign` files).

use std::convert::Infallible;
use std::sync::Arc;

use bytes::BufMut;
use futures_util::TryStreamExt;
use serde::Serialize;
use warp::filters::BoxedFilter;
use warp::http::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE, SET_COOKIE};
use warp::http::StatusCode;
use warp::multipart::{FormData, Part};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use super::protocol::{error_codes, ApiError, ErrorResponse, SESSION_COOKIE};
use super::server::{
    handle_configure, handle_download, handle_get_data_to_sign, handle_show_form,
    handle_sign_document, ConfigureRejection, GatewayState,
};
use crate::domain::contract::{ConfigurationForm, DataToSignParams, SignatureValueParams};
use crate::domain::document::{FileDocument, MimeType, OCTET_STREAM};
use crate::domain::session::{SessionId, SigningVariant};
use crate::infra::error::GatewayError;
use crate::services::download::DownloadResponse;

/// Multipart field carrying the files to sign.
pub const DOCUMENTS_FIELD: &str = "documentsToSign";

const JSON_BODY_LIMIT: u64 = 1024 * 1024;

/// Build all gateway routes.
pub fn build_routes(
    state: Arc<GatewayState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    variant_routes(state.clone(), SigningVariant::SingleDocument)
        .or(variant_routes(state, SigningVariant::MultiDocument))
        .recover(handle_rejection)
}

fn variant_routes(state: Arc<GatewayState>, variant: SigningVariant) -> BoxedFilter<(Response,)> {
    let configure = match variant {
        SigningVariant::SingleDocument => form_configure_route(state.clone(), variant).boxed(),
        SigningVariant::MultiDocument => multipart_configure_route(state.clone(), variant).boxed(),
    };

    show_form_route(state.clone(), variant)
        .or(configure)
        .unify()
        .or(get_data_to_sign_route(state.clone(), variant))
        .unify()
        .or(sign_document_route(state.clone(), variant))
        .unify()
        .or(download_route(state, variant))
        .unify()
        .boxed()
}

/// Inject state into handlers.
fn with_state(
    state: Arc<GatewayState>,
) -> impl Filter<Extract = (Arc<GatewayState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn show_form_route(
    state: Arc<GatewayState>,
    variant: SigningVariant,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path(variant.root_url())
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .map(move |state: Arc<GatewayState>| {
            warp::reply::json(&handle_show_form(&state, variant)).into_response()
        })
}

fn form_configure_route(
    state: Arc<GatewayState>,
    variant: SigningVariant,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let limit = state.max_upload_bytes();
    warp::path(variant.root_url())
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::cookie::optional(SESSION_COOKIE))
        .and(warp::body::content_length_limit(limit))
        .and(warp::body::form::<ConfigurationForm>())
        .and(with_state(state))
        .map(
            move |cookie: Option<String>, form: ConfigurationForm, state: Arc<GatewayState>| {
                configure_reply(&state, variant, cookie.as_deref(), &form)
            },
        )
}

fn multipart_configure_route(
    state: Arc<GatewayState>,
    variant: SigningVariant,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let limit = state.max_upload_bytes();
    warp::path(variant.root_url())
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::cookie::optional(SESSION_COOKIE))
        .and(warp::multipart::form().max_length(limit))
        .and(with_state(state))
        .and_then(
            move |cookie: Option<String>, form: FormData, state: Arc<GatewayState>| async move {
                let reply = match read_multipart(form).await {
                    Ok(form) => configure_reply(&state, variant, cookie.as_deref(), &form),
                    Err(e) => error_reply(ApiError::from(e)),
                };
                Ok::<_, Infallible>(reply)
            },
        )
}

fn get_data_to_sign_route(
    state: Arc<GatewayState>,
    variant: SigningVariant,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path(variant.root_url())
        .and(warp::path("get-data-to-sign"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::cookie::optional(SESSION_COOKIE))
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json::<DataToSignParams>())
        .and(with_state(state))
        .map(
            move |cookie: Option<String>, params: DataToSignParams, state: Arc<GatewayState>| {
                json_reply(handle_get_data_to_sign(
                    &state,
                    variant,
                    cookie.as_deref(),
                    &params,
                ))
            },
        )
}

fn sign_document_route(
    state: Arc<GatewayState>,
    variant: SigningVariant,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path(variant.root_url())
        .and(warp::path("sign-document"))
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::cookie::optional(SESSION_COOKIE))
        .and(warp::body::content_length_limit(JSON_BODY_LIMIT))
        .and(warp::body::json::<SignatureValueParams>())
        .and(with_state(state))
        .map(
            move |cookie: Option<String>,
                  params: SignatureValueParams,
                  state: Arc<GatewayState>| {
                json_reply(handle_sign_document(
                    &state,
                    variant,
                    cookie.as_deref(),
                    &params,
                ))
            },
        )
}

fn download_route(
    state: Arc<GatewayState>,
    variant: SigningVariant,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    warp::path(variant.root_url())
        .and(warp::path("download"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::cookie::optional(SESSION_COOKIE))
        .and(with_state(state))
        .map(move |cookie: Option<String>, state: Arc<GatewayState>| {
            match handle_download(&state, variant, cookie.as_deref()) {
                Ok(download) => attachment_reply(download),
                Err(e) => error_reply(e),
            }
        })
}

/// `Set-Cookie` value for a session id.
#[must_use]
pub fn session_cookie(id: &SessionId) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Strict")
}

fn configure_reply(
    state: &GatewayState,
    variant: SigningVariant,
    cookie: Option<&str>,
    form: &ConfigurationForm,
) -> Response {
    match handle_configure(state, variant, cookie, form) {
        Ok((id, view)) => {
            warp::reply::with_header(warp::reply::json(&view), SET_COOKIE, session_cookie(&id))
                .into_response()
        }
        Err(ConfigureRejection::Form(model)) => {
            warp::reply::with_status(warp::reply::json(&model), StatusCode::BAD_REQUEST)
                .into_response()
        }
        Err(ConfigureRejection::Error(e)) => error_reply(e),
    }
}

fn json_reply<T: Serialize>(result: Result<T, ApiError>) -> Response {
    match result {
        Ok(body) => warp::reply::json(&body).into_response(),
        Err(e) => error_reply(e),
    }
}

fn error_reply(error: ApiError) -> Response {
    if error.status.is_server_error() {
        log::error!("{}: {}", error.body.error_code, error.body.message);
    } else {
        log::warn!("{}: {}", error.body.error_code, error.body.message);
    }
    warp::reply::with_status(warp::reply::json(&error.body), error.status).into_response()
}

fn attachment_reply(download: DownloadResponse) -> Response {
    let content_type = HeaderValue::from_str(&download.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
    // File names may carry UTF-8; header values accept opaque bytes.
    let disposition = HeaderValue::from_bytes(download.content_disposition.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = Response::new(download.body.into());
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(
        "content-transfer-encoding",
        HeaderValue::from_static(download.transfer_encoding),
    );
    response
}

/// Read a multipart configuration form.
///
/// Each part body is drained before the next part is requested.
async fn read_multipart(mut form: FormData) -> Result<ConfigurationForm, GatewayError> {
    let mut config = ConfigurationForm::default();
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| GatewayError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        let name = part.name().to_string();
        let file_name = part.filename().map(str::to_string);
        let mime_type = part.content_type().and_then(MimeType::parse);
        let bytes = read_part(part).await?;

        if name == DOCUMENTS_FIELD {
            match file_name {
                Some(file_name) if !file_name.trim().is_empty() => {
                    config.documents.push(FileDocument {
                        name: file_name,
                        bytes,
                        mime_type,
                    });
                }
                // Browsers send an empty part when no file was picked.
                _ => log::debug!("Skipping {DOCUMENTS_FIELD} part without a file name"),
            }
            continue;
        }

        let value = String::from_utf8(bytes)
            .map_err(|_| GatewayError::InvalidInput(format!("form field {name} is not UTF-8")))?;
        if !config.set_text_field(&name, value) {
            log::debug!("Ignoring unknown form field {name}");
        }
    }
    Ok(config)
}

async fn read_part(part: Part) -> Result<Vec<u8>, GatewayError> {
    part.stream()
        .try_fold(Vec::new(), |mut buf, chunk| async move {
            buf.put(chunk);
            Ok(buf)
        })
        .await
        .map_err(|e| GatewayError::InvalidInput(format!("failed to read form part: {e}")))
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, code, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, "no such endpoint".to_string())
    } else if let Some(e) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, error_codes::BAD_REQUEST, e.to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            error_codes::PAYLOAD_TOO_LARGE,
            "request body exceeds the configured limit".to_string(),
        )
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            error_codes::BAD_REQUEST,
            "method not allowed".to_string(),
        )
    } else {
        log::warn!("Rejected request: {rejection:?}");
        (
            StatusCode::BAD_REQUEST,
            error_codes::BAD_REQUEST,
            format!("{rejection:?}"),
        )
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorResponse::new(code, message)),
        status,
    )
    .into_response())
}
