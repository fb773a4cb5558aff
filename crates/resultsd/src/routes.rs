//! Search page routes
//!
//! `GET /` shows the empty form, `POST /` runs a lookup. Both always answer
//! 200 with a full HTML page.

use crate::render::render_page;
use crate::server::AppState;
use axum::{
    extract::{rejection::FormRejection, State},
    response::Html,
    routing::get,
    Form, Router,
};
use results_common::ViewState;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

type AppStateArc = Arc<AppState>;

/// Submitted search form
#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub seating_no: Option<String>,
}

pub fn search_routes() -> Router<AppStateArc> {
    Router::new().route("/", get(search_page).post(submit_search))
}

async fn search_page() -> Html<String> {
    Html(render_page(&ViewState::NoQuery))
}

async fn submit_search(
    State(state): State<AppStateArc>,
    form: Result<Form<SearchForm>, FormRejection>,
) -> Html<String> {
    // An unreadable body is handled like an empty submission
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            debug!("Ignoring unreadable search form: {}", rejection);
            SearchForm::default()
        }
    };

    let view = state.lookup.resolve(form.seating_no.as_deref()).await;
    info!("Search {:?} -> {}", view.query(), view.label());

    Html(render_page(&view))
}
