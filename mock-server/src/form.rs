//! Optional multipart bodies and the `/uploads` file route.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::reply::{fail, Reply};
use crate::state::Db;

#[derive(Debug)]
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Text and file parts of a multipart body, by field name.
#[derive(Debug, Default)]
pub struct FormData {
    pub texts: HashMap<String, String>,
    pub files: HashMap<String, FilePart>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<String> {
        self.texts.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

/// Parse the body as multipart when it is one; any other body reads as an
/// empty form.
pub async fn read_form(req: Request) -> Result<FormData, Reply> {
    let mut form = FormData::default();
    if !is_multipart(&req) {
        return Ok(form);
    }

    let bad_form = || fail(StatusCode::BAD_REQUEST, "malformed multipart body");
    let mut multipart = Multipart::from_request(req, &()).await.map_err(|_| bad_form())?;
    while let Some(field) = multipart.next_field().await.map_err(|_| bad_form())? {
        let name = field.name().unwrap_or_default().to_string();
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(|_| bad_form())?;
                form.files.insert(
                    name,
                    FilePart {
                        file_name,
                        content_type,
                        bytes,
                    },
                );
            }
            None => {
                let value = field.text().await.map_err(|_| bad_form())?;
                form.texts.insert(name, value);
            }
        }
    }
    Ok(form)
}

pub async fn get_upload(State(db): State<Db>, Path(name): Path<String>) -> Response {
    let store = db.read().await;
    match store.uploads.get(&name) {
        Some(upload) => (
            [(header::CONTENT_TYPE, upload.content_type.clone())],
            upload.bytes.clone(),
        )
            .into_response(),
        None => fail(StatusCode::NOT_FOUND, "file not found").into_response(),
    }
}
