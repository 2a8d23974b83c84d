//! Request handlers
//!
//! Read routes return JSON; write routes accept form or multipart bodies
//! and always answer with a redirect to the listing page, logging rather
//! than surfacing the failure. Every handler opens its own store handle
//! and drops it when the request ends.

use axum::{
    Form, Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, Redirect},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::Error;
use crate::book::{Book, BookDraft};
use crate::import;
use crate::server::AppState;
use crate::storage::BookStore;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type JsonError = (StatusCode, Json<ErrorResponse>);

/// Book fields as submitted by the add/edit forms.
///
/// Everything is optional at the extractor level; missing fields default
/// to empty and fail draft validation instead of producing a 400.
#[derive(Deserialize, Default)]
pub struct BookForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub quantity: Option<String>,
    pub room: Option<String>,
    pub shelf: Option<String>,
    pub section: Option<String>,
}

impl BookForm {
    fn into_draft(self) -> BookDraft {
        BookDraft {
            title: self.title.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            isbn: self.isbn.unwrap_or_default(),
            quantity: self
                .quantity
                .as_deref()
                .and_then(|q| q.trim().parse().ok())
                .unwrap_or(0),
            room: self.room,
            shelf: self.shelf,
            section: self.section,
        }
    }
}

fn open_store(state: &AppState) -> Result<BookStore, JsonError> {
    BookStore::open(&state.database_path).map_err(internal_error)
}

fn internal_error(e: impl std::fmt::Display) -> JsonError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

/// GET / - all books as JSON
pub async fn list_books(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Book>>, JsonError> {
    let store = open_store(&state)?;
    let books = store.list_all().map_err(internal_error)?;
    Ok(Json(books))
}

/// GET /add - static add form
pub async fn add_form() -> Html<&'static str> {
    Html(include_str!("../../static/add.html"))
}

/// POST /add - create a book from form fields
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Form(form): Form<BookForm>,
) -> Redirect {
    let draft = form.into_draft();
    let result = BookStore::open(&state.database_path).and_then(|store| store.create(&draft));
    if let Err(e) = result {
        tracing::warn!("create of {:?} failed: {}", draft.isbn, e);
    }
    Redirect::to("/")
}

/// GET /edit/{id} - the book as JSON, 404 when absent
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, JsonError> {
    let store = open_store(&state)?;
    match store.get(id).map_err(internal_error)? {
        Some(book) => Ok(Json(book)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: Error::NotFound(id).to_string(),
            }),
        )),
    }
}

/// POST /edit/{id} - overwrite all mutable fields
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Form(form): Form<BookForm>,
) -> Redirect {
    let draft = form.into_draft();
    let result = BookStore::open(&state.database_path).and_then(|store| store.update(id, &draft));
    if let Err(e) = result {
        tracing::warn!("update of book {} failed: {}", id, e);
    }
    Redirect::to("/")
}

/// POST /delete/{id} - delete; absent ids are a no-op
pub async fn delete_book(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Redirect {
    let result = BookStore::open(&state.database_path).and_then(|store| store.delete(id));
    if let Err(e) = result {
        tracing::warn!("delete of book {} failed: {}", id, e);
    }
    Redirect::to("/")
}

/// GET /search?q= - substring matches as JSON; empty query returns all
pub async fn search_books(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Book>>, JsonError> {
    let store = open_store(&state)?;
    let query = params.q.unwrap_or_default();
    let books = store.search(&query).map_err(internal_error)?;
    Ok(Json(books))
}

/// GET /import - static upload form
pub async fn import_form() -> Html<&'static str> {
    Html(include_str!("../../static/import.html"))
}

/// POST /import - stage the uploaded workbook and run the bulk import.
///
/// The staging file is removed after a successful batch; a file-level
/// abort leaves cleanup best-effort and the response is still a redirect.
pub async fn import_books(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Redirect {
    match stage_upload(&state, &mut multipart).await {
        Ok(Some(staged)) => {
            let outcome = BookStore::open(&state.database_path)
                .and_then(|mut store| import::import_workbook(&mut store, &staged));
            match outcome {
                Ok(report) => {
                    tracing::info!("imported {}: {}", staged.display(), report);
                    if let Err(e) = std::fs::remove_file(&staged) {
                        tracing::warn!(
                            "could not remove staging file {}: {}",
                            staged.display(),
                            e
                        );
                    }
                }
                Err(e) => tracing::error!("import of {} aborted: {}", staged.display(), e),
            }
        }
        Ok(None) => tracing::warn!("import request carried no usable file"),
        Err(e) => tracing::error!("upload failed: {}", e),
    }
    Redirect::to("/")
}

/// Persist the first uploaded file to the staging directory.
///
/// `None` when no file field was present, the file name has a disallowed
/// extension, or the file is empty - all of which make the import a no-op.
async fn stage_upload(
    state: &AppState,
    multipart: &mut Multipart,
) -> anyhow::Result<Option<PathBuf>> {
    while let Some(field) = multipart.next_field().await? {
        let Some(original) = field.file_name().map(str::to_string) else {
            continue;
        };

        // strip any client-supplied directory components
        let file_name = std::path::Path::new(&original)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        if !import::is_allowed_file(&file_name) {
            tracing::warn!("rejected upload {:?}: extension not allowed", original);
            return Ok(None);
        }

        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }

        std::fs::create_dir_all(&state.upload_dir)?;
        let staged = state.upload_dir.join(&file_name);
        std::fs::write(&staged, &bytes)?;
        return Ok(Some(staged));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::router;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(AppState {
            database_path: dir.path().join("library.db"),
            upload_dir: dir.path().join("uploads"),
        });
        (dir, state)
    }

    fn form_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_add_then_list() {
        let (_dir, state) = test_state();
        let app = router(state);

        let response = app
            .clone()
            .oneshot(form_request("/add", "title=T&author=A&isbn=123&quantity=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = app.oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let books = body_json(response).await;
        assert!(
            books
                .as_array()
                .unwrap()
                .iter()
                .any(|b| b["isbn"] == "123" && b["title"] == "T")
        );
    }

    #[tokio::test]
    async fn test_duplicate_add_redirects_and_keeps_one() {
        let (_dir, state) = test_state();
        let app = router(state);

        let body = "title=T&author=A&isbn=123&quantity=1";
        app.clone().oneshot(form_request("/add", body)).await.unwrap();
        let response = app.clone().oneshot(form_request("/add", body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let books = body_json(app.oneshot(get_request("/")).await.unwrap()).await;
        assert_eq!(books.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_roundtrip_and_missing_id() {
        let (_dir, state) = test_state();
        let app = router(state);

        app.clone()
            .oneshot(form_request("/add", "title=T&author=A&isbn=123&quantity=1"))
            .await
            .unwrap();
        let books = body_json(app.clone().oneshot(get_request("/")).await.unwrap()).await;
        let id = books[0]["id"].as_i64().unwrap();

        let response = app
            .clone()
            .oneshot(form_request(
                &format!("/edit/{}", id),
                "title=T2&author=A&isbn=123&quantity=4",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let book = body_json(
            app.clone()
                .oneshot(get_request(&format!("/edit/{}", id)))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(book["title"], "T2");
        assert_eq!(book["quantity"], 4);

        let response = app.oneshot(get_request("/edit/9999")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, state) = test_state();
        let app = router(state);

        app.clone()
            .oneshot(form_request("/add", "title=T&author=A&isbn=123&quantity=1"))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(form_request("/delete/9999", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let books = body_json(app.oneshot(get_request("/")).await.unwrap()).await;
        assert_eq!(books.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_empty_query_returns_all() {
        let (_dir, state) = test_state();
        let app = router(state);

        for body in [
            "title=Dune&author=Frank+Herbert&isbn=111&quantity=1",
            "title=Neuromancer&author=William+Gibson&isbn=222&quantity=1",
        ] {
            app.clone().oneshot(form_request("/add", body)).await.unwrap();
        }

        let all = body_json(app.clone().oneshot(get_request("/")).await.unwrap()).await;
        let searched = body_json(app.clone().oneshot(get_request("/search?q=")).await.unwrap()).await;
        assert_eq!(all, searched);

        let hits = body_json(app.oneshot(get_request("/search?q=Gibson")).await.unwrap()).await;
        assert_eq!(hits.as_array().unwrap().len(), 1);
        assert_eq!(hits[0]["isbn"], "222");
    }

    #[tokio::test]
    async fn test_import_rejects_disallowed_extension() {
        let (_dir, state) = test_state();
        let app = router(state.clone());

        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"books.csv\"\r\nContent-Type: text/csv\r\n\r\ntitle,author\r\n--{b}--\r\n",
            b = boundary
        );
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/import")
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={}", boundary),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        // rejected before staging: nothing inserted, nothing staged
        let books = body_json(app.oneshot(get_request("/")).await.unwrap()).await;
        assert!(books.as_array().unwrap().is_empty());
        assert!(!state.upload_dir.exists());
    }

    #[tokio::test]
    async fn test_forms_are_served() {
        let (_dir, state) = test_state();
        let app = router(state);

        for uri in ["/add", "/import"] {
            let response = app.clone().oneshot(get_request(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
}
