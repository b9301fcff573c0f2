//! `/profile` routes.

use axum::{
    extract::{Path, Request, State},
    Extension,
};
use tracing::info;

use crate::auth::AuthUser;
use crate::form::read_form;
use crate::reply::{not_found, ok, Reply};
use crate::state::Db;

pub async fn get_profile(State(db): State<Db>, Extension(auth): Extension<AuthUser>) -> Reply {
    let store = db.read().await;
    match store.users.get(&auth.id) {
        Some(user) => ok("profile loaded", user.profile()),
        None => not_found("user"),
    }
}

pub async fn get_user_profile(State(db): State<Db>, Path(id): Path<u64>) -> Reply {
    let store = db.read().await;
    match store.users.get(&id) {
        Some(user) => ok("profile loaded", user.profile()),
        None => not_found("user"),
    }
}

/// Multipart update. Absent fields keep their value; `avatar` is either an
/// uploaded file or a path to an existing upload.
pub async fn update_profile(
    State(db): State<Db>,
    Extension(auth): Extension<AuthUser>,
    req: Request,
) -> Reply {
    let form = match read_form(req).await {
        Ok(form) => form,
        Err(reply) => return reply,
    };

    let mut store = db.write().await;
    let avatar = match form.files.get("avatar") {
        Some(file) => Some(store.save_upload(
            &file.file_name,
            file.content_type.clone(),
            file.bytes.to_vec(),
        )),
        None => form.text("avatar"),
    };

    let Some(user) = store.users.get_mut(&auth.id) else {
        return not_found("user");
    };
    if let Some(value) = form.text("phoneNumber") {
        user.phone_number = Some(value);
    }
    if let Some(value) = form.text("studentId") {
        user.student_id = Some(value);
    }
    if let Some(value) = form.text("gender") {
        user.gender = Some(value);
    }
    if let Some(value) = form.text("email") {
        user.email = Some(value);
    }
    if avatar.is_some() {
        user.avatar_url = avatar;
    }

    info!(user_id = auth.id, "profile updated");
    ok("profile updated", user.profile())
}
