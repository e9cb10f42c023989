//! Exam Shuffler Library
//!
//! Parses a `.docx` quiz into questions, produces shuffled variants and
//! packages them with an answer key. The HTTP binary is in main.rs.
//!
//! # Modules
//!
//! - `exam`: question model, structure extraction, segmentation, shuffling
//! - `docx`: reading source documents and writing variant documents
//! - `xlsx`: answer-key spreadsheet writer
//! - `archive`: zip bundle of all outputs
//! - `pipeline`: one upload turned into one archive
//! - `routes`: HTTP endpoints

pub mod archive;
pub mod config;
pub mod docx;
pub mod error;
pub mod exam;
pub mod ooxml;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod workspace;
pub mod xlsx;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config().server.max_upload_bytes;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/api/health", get(routes::health::health_check))
        .nest("/api/exams", routes::exams::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
