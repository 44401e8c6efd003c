//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use waitroom_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const UNAUTHORIZED: i32 = 4010;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const STORE_ERROR: i32 = 5001;
    pub const COLLABORATOR_ERROR: i32 = 5002;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::Domain(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::Unauthorized(msg) => {
            ErrorObjectOwned::owned(code::UNAUTHORIZED, msg, None::<()>)
        }
        AppError::StoreUnavailable(msg) => {
            ErrorObjectOwned::owned(code::STORE_ERROR, msg, None::<()>)
        }
        AppError::Collaborator(msg) => {
            ErrorObjectOwned::owned(code::COLLABORATOR_ERROR, msg, None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waitroom_core::domain::DomainError;

    #[test]
    fn test_error_codes() {
        let cases = [
            (AppError::Validation("x".into()), code::VALIDATION_ERROR),
            (
                AppError::Domain(DomainError::ValidationError("x".into())),
                code::VALIDATION_ERROR,
            ),
            (AppError::NotFound("x".into()), code::NOT_FOUND),
            (AppError::Unauthorized("x".into()), code::UNAUTHORIZED),
            (AppError::StoreUnavailable("x".into()), code::STORE_ERROR),
            (AppError::Collaborator("x".into()), code::COLLABORATOR_ERROR),
            (AppError::Config("x".into()), code::INTERNAL_ERROR),
            (AppError::Internal("x".into()), code::INTERNAL_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(to_rpc_error(err).code(), expected);
        }
    }

    #[test]
    fn test_message_is_kept() {
        let err = to_rpc_error(AppError::NotFound("User not found in queue".into()));
        assert_eq!(err.message(), "User not found in queue");
    }
}
