//! Internal helpers for model validation and conversion.

use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Reject zero and negative amounts before any side effect.
pub(crate) fn ensure_positive(amount_minor: i64) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(
            "amount_minor must be > 0".to_string(),
        ));
    }
    Ok(())
}

/// A fresh unique reference such as `TXN_9F2C4A7E1B3D5F60`.
pub(crate) fn new_reference(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{prefix}{}", &simple[..16])
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn references_are_prefixed_and_distinct() {
        let a = new_reference("TXN_");
        let b = new_reference("TXN_");
        assert!(a.starts_with("TXN_"));
        assert_eq!(a.len(), 20);
        assert_ne!(a, b);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(ensure_positive(1).is_ok());
        assert!(ensure_positive(0).is_err());
        assert!(ensure_positive(-5).is_err());
    }
}
