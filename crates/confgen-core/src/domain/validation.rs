use crate::domain::{error::DomainError, schema::VariableSchema};

/// Checks on input the domain receives from adapters.
pub struct DomainValidator;

impl DomainValidator {
    /// A schema from an adapter must not declare blank names or fields.
    pub fn validate_schema(schema: &VariableSchema) -> Result<(), DomainError> {
        if let Some(bad) = schema.names().into_iter().find(|n| n.trim().is_empty()) {
            return Err(DomainError::InvalidSchema(format!(
                "blank variable name {:?}",
                bad
            )));
        }
        for (list, fields) in schema.lists() {
            if fields.iter().any(|f| f.trim().is_empty()) {
                return Err(DomainError::InvalidSchema(format!(
                    "list '{}' declares a blank field",
                    list
                )));
            }
        }
        Ok(())
    }
}
