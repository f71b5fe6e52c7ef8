use tracing::warn;

use crate::domain::errors::DispatchError;

/// Only one designated operator may drive blasts.
#[derive(Debug, Clone)]
pub struct OperatorPolicy {
    operator_id: String,
}

impl OperatorPolicy {
    pub fn new(operator_id: impl Into<String>) -> Self {
        Self {
            operator_id: operator_id.into(),
        }
    }

    pub fn operator_id(&self) -> &str {
        &self.operator_id
    }

    pub fn authorize(&self, caller_id: &str) -> Result<(), DispatchError> {
        if caller_id != self.operator_id {
            warn!(caller = caller_id, "rejected command from non-operator");
            return Err(DispatchError::AuthorizationDenied);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_operator_passes() {
        let policy = OperatorPolicy::new("42");
        assert!(policy.authorize("42").is_ok());
        assert!(matches!(
            policy.authorize("43"),
            Err(DispatchError::AuthorizationDenied)
        ));
    }
}
