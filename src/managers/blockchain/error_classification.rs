//! Classifies upstream RPC failures into retryable and fatal.
//!
//! Retryable: malformed response bodies, HTTP 503, invalid-method-params
//! responses (observed as random node flakiness, not caller bugs), and
//! responses missing their JSON-RPC envelope. Everything else propagates
//! to the caller unchanged.

use alloy::transports::{RpcError, TransportErrorKind};

const INVALID_PARAMS_CODE: i64 = -32602;

pub(crate) fn is_retryable_rpc_error(err: &RpcError<TransportErrorKind>) -> bool {
    match err {
        RpcError::Transport(kind) => match kind {
            TransportErrorKind::HttpError(http) => http.is_temporarily_unavailable(),
            TransportErrorKind::MissingBatchResponse(_) => true,
            _ => false,
        },
        // e.g. {'code': -32602, 'message': 'invalid method params'} from
        // flaky public endpoints
        RpcError::ErrorResp(payload) => {
            payload.code == INVALID_PARAMS_CODE
                || payload
                    .message
                    .to_ascii_lowercase()
                    .contains("invalid method param")
        }
        // Response body that does not parse as JSON-RPC
        RpcError::DeserError { .. } => true,
        // Envelope present but carrying no result
        RpcError::NullResp => true,
        _ => false,
    }
}
