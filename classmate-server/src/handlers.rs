use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use classmate_api::{Comment, Event, NewComment, NewEvent, NewThread, RecordId, Thread};

use crate::{extractors::*, Error, Store};

pub async fn fetch_events(State(store): State<Store>) -> Json<Vec<Event>> {
    Json(store.events().await)
}

pub async fn fetch_event(
    State(store): State<Store>,
    Path(id): Path<RecordId>,
) -> Result<Json<Event>, Error> {
    match store.event(&id).await {
        Some(event) => Ok(Json(event)),
        None => Err(Error::not_found(id)),
    }
}

pub async fn create_event(
    State(store): State<Store>,
    JsonBody(data): JsonBody<NewEvent>,
) -> Result<Json<Event>, Error> {
    let event = data.into_event(RecordId::random())?;
    store.add_event(event.clone()).await?;
    tracing::info!(id = %event.id, title = %event.title, "added event and saved events");
    Ok(Json(event))
}

pub async fn fetch_categories(State(store): State<Store>) -> Json<Vec<String>> {
    Json(store.categories().await)
}

pub async fn fetch_threads(State(store): State<Store>) -> Json<Vec<Thread>> {
    Json(store.threads().await)
}

pub async fn fetch_thread(
    State(store): State<Store>,
    Path(id): Path<RecordId>,
) -> Result<Json<Thread>, Error> {
    match store.thread(&id).await {
        Some(thread) => Ok(Json(thread)),
        None => Err(Error::not_found(id)),
    }
}

pub async fn create_thread(
    State(store): State<Store>,
    JsonBody(data): JsonBody<NewThread>,
) -> Result<Json<Thread>, Error> {
    let thread = data.into_thread(RecordId::random(), Utc::now())?;
    store.add_thread(thread.clone()).await?;
    tracing::info!(id = %thread.id, category = %thread.category, "added thread and saved threads");
    Ok(Json(thread))
}

pub async fn create_comment(
    State(store): State<Store>,
    Path(thread): Path<RecordId>,
    JsonBody(data): JsonBody<NewComment>,
) -> Result<Json<Comment>, Error> {
    let comment = data.into_comment(Utc::now())?;
    store.add_comment(&thread, comment.clone()).await?;
    tracing::info!(%thread, "added comment and saved threads");
    Ok(Json(comment))
}
