use std::fmt;
use serde::Serialize;
use serde_json::Value;
use crate::model::schema::Schema;
use crate::Item;

/// One failed constraint: its name and message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraint {
    pub name: String,
    pub message: String,
}

/// All failed constraints of one property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub property: String,
    pub constraints: Vec<Constraint>,
}

/// Failures of one validated object. `index` is the position of the object
/// in a batch, and `None` for single-object operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemErrors {
    pub index: Option<usize>,
    pub errors: Vec<FieldError>,
}

/// The payload of [`crate::Error::Validation`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationErrors {
    pub items: Vec<ItemErrors>,
}

impl ValidationErrors {
    pub fn single(errors: Vec<FieldError>) -> Self {
        Self { items: vec![ItemErrors { index: None, errors }] }
    }

    /// Every failing field across all objects.
    pub fn fields(&self) -> impl Iterator<Item = &FieldError> {
        self.items.iter().flat_map(|i| i.errors.iter())
    }

    pub fn has_field(&self, property: &str) -> bool {
        self.fields().any(|e| e.property == property)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for item in &self.items {
            for err in &item.errors {
                for c in &err.constraints {
                    if !first {
                        f.write_str("; ")?;
                    }
                    first = false;
                    match item.index {
                        Some(i) => write!(f, "[{}] {}", i, c.message)?,
                        None => f.write_str(&c.message)?,
                    }
                }
            }
        }
        Ok(())
    }
}

/// Checks `item` against every rule of `schema`.
///
/// With `partial` set, fields that are missing or `null` are skipped; otherwise
/// they are checked as `null` unless the rule is optional. Fields without rules are ignored. Errors are
/// grouped per property in the order the properties first appear in the schema.
pub fn validate(schema: &Schema, item: &Item, partial: bool) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = Vec::new();

    for rule in schema.rules() {
        let value = item.get(&rule.field).unwrap_or(&Value::Null);
        if (partial || rule.optional) && value.is_null() {
            continue;
        }
        if rule.check.test(value) {
            continue;
        }

        let constraint = Constraint {
            name: rule.check.name().to_string(),
            message: rule.message.clone(),
        };
        match errors.iter_mut().find(|e| e.property == rule.field) {
            Some(existing) => existing.constraints.push(constraint),
            None => errors.push(FieldError {
                property: rule.field.clone(),
                constraints: vec![constraint],
            }),
        }
    }

    errors
}
