//! Roxy file manager endpoint: `POST /admin/roxy?a=ACTION`.
//!
//! Parameters come from the query string and, depending on the client, from a
//! urlencoded form or a multipart body. Multipart file parts are uploads.

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;

use service::media::{RoxyAction, RoxyOutput, RoxyParams};
use service::media::roxy::UploadedFile;

use super::auth::ServerState;
use crate::admin::CurrentAdmin;
use crate::errors::JsonApiError;

#[derive(Debug, Default, Deserialize)]
pub struct RoxyQuery {
    #[serde(default)]
    pub a: String,
    #[serde(flatten)]
    pub params: RoxyParams,
}

fn merge(into: &mut RoxyParams, from: RoxyParams) {
    into.d = from.d.or(into.d.take());
    into.f = from.f.or(into.f.take());
    into.n = from.n.or(into.n.take());
    into.kind = from.kind.or(into.kind.take());
}

fn invalid(detail: String) -> JsonApiError {
    JsonApiError::new(StatusCode::BAD_REQUEST, "Invalid file manager request", Some(detail))
}

async fn read_multipart(mut multipart: Multipart, params: &mut RoxyParams) -> Result<Vec<UploadedFile>, JsonApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| invalid(e.to_string()))? {
        let field_name = field.name().unwrap_or_default().to_string();
        if let Some(file_name) = field.file_name().map(str::to_string) {
            let bytes = field.bytes().await.map_err(|e| invalid(e.to_string()))?;
            uploads.push(UploadedFile { name: file_name, bytes: bytes.to_vec() });
            continue;
        }
        let value = field.text().await.map_err(|e| invalid(e.to_string()))?;
        let slot = match field_name.as_str() {
            "d" => &mut params.d,
            "f" => &mut params.f,
            "n" => &mut params.n,
            "type" => &mut params.kind,
            _ => continue,
        };
        *slot = Some(value);
    }
    Ok(uploads)
}

pub async fn roxy(
    State(state): State<ServerState>,
    admin: CurrentAdmin,
    Query(query): Query<RoxyQuery>,
    request: Request,
) -> Result<Response, JsonApiError> {
    let action: RoxyAction = query.a.parse()?;
    let mut params = query.params;
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let uploads = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state).await.map_err(|e| invalid(e.body_text()))?;
        read_multipart(multipart, &mut params).await?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(form) = Form::<RoxyParams>::from_request(request, &state).await.map_err(|e| invalid(e.body_text()))?;
        merge(&mut params, form);
        Vec::new()
    } else {
        Vec::new()
    };

    tracing::debug!(admin = admin.id(), ?action, "file manager request");
    let out = state.files.handle(action, &params, uploads).await;
    Ok(match out {
        RoxyOutput::Status(status) => Json(status).into_response(),
        RoxyOutput::Dirs(dirs) => Json(dirs).into_response(),
        RoxyOutput::Files(files) => Json(files).into_response(),
        RoxyOutput::Download { name, bytes } => (
            [
                (header::CONTENT_TYPE, "application/octet-stream".to_string()),
                (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", name.replace('"', ""))),
            ],
            bytes,
        )
            .into_response(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_fields_override_query_fields() {
        let mut params = RoxyParams { d: Some("/a".into()), f: Some("/a/x.png".into()), ..Default::default() };
        merge(&mut params, RoxyParams { d: Some("/b".into()), ..Default::default() });
        assert_eq!(params.d.as_deref(), Some("/b"));
        assert_eq!(params.f.as_deref(), Some("/a/x.png"));
    }
}
