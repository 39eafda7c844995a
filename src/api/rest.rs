//! REST API endpoints for the provenance gateway.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;

use super::error::ApiError;
use super::types::{
    ConnectResponse, CreateProductRequest, CreateProductResponse, HistoryResponse,
    ProductResponse, ProductsResponse, TransferRequest, TransferResponse, UploadResponse,
};
use crate::domain::{CreateRecordInput, TransferInput};
use crate::infra::{GatewayError, UpstreamService};
use crate::metrics::metric_names;
use crate::server::AppState;

/// Largest multipart body accepted by `/upload`.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the ungated part of the `/api` router: connection control and uploads.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/connect-blockchain", post(connect_blockchain))
        .route("/reset-blockchain", post(reset_blockchain))
        .route(
            "/upload",
            post(upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
}

/// Build the ledger-backed part of the `/api` router.
///
/// Callers layer [`super::require_connected`] over it so every route answers
/// 503 until the connection is up.
pub fn ledger_router() -> Router<AppState> {
    Router::new()
        .route("/products", post(create_product).get(list_products))
        .route("/products/:id", get(get_product))
        .route("/products/:id/ship", post(ship_product))
        .route("/products/:id/receive", post(receive_product))
        .route("/products/:id/history", get(product_history))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

// ============================================================================
// Connection control
// ============================================================================

async fn connect_blockchain(
    State(state): State<AppState>,
) -> Result<Json<ConnectResponse>, ApiError> {
    state.connection.connect().await?;

    Ok(Json(ConnectResponse {
        success: true,
        message: "Connected to ledger".to_string(),
        phase: state.connection.phase(),
    }))
}

async fn reset_blockchain(State(state): State<AppState>) -> Json<ConnectResponse> {
    state.connection.reset().await;
    info!("Ledger connection reset via API");

    Json(ConnectResponse {
        success: true,
        message: "Ledger connection reset".to_string(),
        phase: state.connection.phase(),
    })
}

// ============================================================================
// Products
// ============================================================================

async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateProductResponse>), ApiError> {
    let input = CreateRecordInput::from(json_body(body)?);
    let outcome = state.coordinator.create_record(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateProductResponse {
            success: true,
            message: format!("Product {} created", outcome.record_id),
            record_id: outcome.record_id,
            integrity_hash: outcome.integrity_hash,
            attachment_recorded: outcome.projected_attachment,
        }),
    ))
}

async fn list_products(State(state): State<AppState>) -> Result<Json<ProductsResponse>, ApiError> {
    let products = state.queries.get_all_records().await?;
    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let product = state.queries.get_record(&id).await?;
    Ok(Json(ProductResponse {
        success: true,
        product,
    }))
}

async fn ship_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferResponse>, ApiError> {
    let request = json_body(body)?;
    let input = TransferInput::new(id, request.new_owner);
    state.coordinator.ship_record(input.clone()).await?;

    Ok(Json(TransferResponse {
        success: true,
        message: format!("Product {} shipped to {}", input.id, input.new_owner),
        record_id: input.id,
        new_owner: input.new_owner,
    }))
}

async fn receive_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferResponse>, ApiError> {
    let request = json_body(body)?;
    let input = TransferInput::new(id, request.new_owner);
    state.coordinator.receive_record(input.clone()).await?;

    Ok(Json(TransferResponse {
        success: true,
        message: format!("Product {} received by {}", input.id, input.new_owner),
        record_id: input.id,
        new_owner: input.new_owner,
    }))
}

async fn product_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.queries.get_history(&id).await?;
    Ok(Json(HistoryResponse {
        success: true,
        history,
    }))
}

// ============================================================================
// Uploads
// ============================================================================

/// Store one file in the content store.
///
/// Takes the multipart field named `document`, or failing that the first
/// field that carries a file name.
async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        let named_document = field.name() == Some("document");
        if upload.is_some() && !named_document {
            continue;
        }

        let file_name = match field.file_name() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ if named_document => "document".to_string(),
            _ => continue,
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("failed to read upload: {e}")))?;

        upload = Some((file_name, bytes.to_vec()));
        if named_document {
            break;
        }
    }

    let Some((file_name, bytes)) = upload else {
        return Err(ApiError::bad_request("no file uploaded"));
    };

    let stored = state
        .content
        .add(&file_name, bytes)
        .await
        .map_err(|e| GatewayError::upstream(UpstreamService::ContentStore, e))?;
    state.metrics.inc_counter(metric_names::UPLOADS).await;
    info!(content_hash = %stored.content_hash, file_name = %stored.file_name, "Document stored");

    Ok(Json(UploadResponse {
        success: true,
        content_hash: stored.content_hash,
        file_name: stored.file_name,
        size: stored.size,
    }))
}
