use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, router, run_with_listener};

mod accounts;
mod payments;
mod server;
mod transactions;
mod views;
mod wallets;

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::AccountNotFound(_)
        | EngineError::WalletNotFound(_)
        | EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ExistingKey(_) | EngineError::WalletLocked(_) => StatusCode::CONFLICT,
        EngineError::InvalidId(_) | EngineError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        EngineError::SignatureMismatch => StatusCode::UNAUTHORIZED,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::GatewayUnavailable(_)
        | EngineError::GatewayAuthFailed(_)
        | EngineError::GatewayChargeFailed(_)
        | EngineError::GatewayVerificationFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::AccountInactive(_)
        | EngineError::WalletInactive(_)
        | EngineError::InsufficientBalance { .. }
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidCategory(_)
        | EngineError::AlreadyReversed(_)
        | EngineError::NotReversible(_)
        | EngineError::InvalidTransactionState(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => {
            if let Some(detail) = other.gateway_detail() {
                tracing::error!("payment gateway error: {detail}");
            }
            other.to_string()
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use engine::BalanceType;

    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ServerError::from(err).into_response().status()
    }

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(
            status_of(EngineError::WalletNotFound("u1".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::KeyNotFound("TXN_1".to_string())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn locked_wallet_maps_to_409() {
        assert_eq!(
            status_of(EngineError::WalletLocked("u1".to_string())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn balance_and_state_violations_map_to_422() {
        assert_eq!(
            status_of(EngineError::InsufficientBalance {
                balance_type: BalanceType::Deposit,
                available: engine::Money::new(100),
                requested: engine::Money::new(150),
                shortfall: engine::Money::new(50),
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(EngineError::WalletInactive("u1".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(EngineError::AlreadyReversed("TXN_1".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn gateway_failures_map_to_503() {
        assert_eq!(
            status_of(EngineError::GatewayChargeFailed("timeout".to_string())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn database_errors_map_to_500() {
        assert_eq!(
            status_of(EngineError::Database(sea_orm::DbErr::Custom(
                "disk full".to_string()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
