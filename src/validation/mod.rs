use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be one of [{}], got '{value}'", .allowed.join(", "))]
    NotAllowed {
        field: &'static str,
        allowed: &'static [&'static str],
        value: String,
    },
}

/// Value of a single field, as seen by a rule.
#[derive(Debug, Clone, Copy)]
pub enum FieldValue<'a> {
    Int(i64),
    Str(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum Constraint {
    /// Inclusive integer range.
    Range { min: i64, max: i64 },
    NonEmpty,
    OneOf(&'static [&'static str]),
}

/// One row of a constraint table: which field, how to read it, what it must satisfy.
pub struct FieldRule<T> {
    pub field: &'static str,
    pub value: fn(&T) -> FieldValue<'_>,
    pub constraint: Constraint,
}

impl<T> FieldRule<T> {
    pub const fn new(
        field: &'static str,
        value: fn(&T) -> FieldValue<'_>,
        constraint: Constraint,
    ) -> Self {
        Self {
            field,
            value,
            constraint,
        }
    }

    fn check(&self, target: &T) -> Result<(), ValidationError> {
        let value = (self.value)(target);

        match (self.constraint, value) {
            (Constraint::Range { min, max }, FieldValue::Int(v)) => {
                if v < min || v > max {
                    return Err(ValidationError::OutOfRange {
                        field: self.field,
                        min,
                        max,
                        value: v,
                    });
                }
            }
            (Constraint::Range { min, max }, FieldValue::Str(s)) => {
                // A string under a range rule is checked by its length
                let len = s.chars().count() as i64;
                if len < min || len > max {
                    return Err(ValidationError::OutOfRange {
                        field: self.field,
                        min,
                        max,
                        value: len,
                    });
                }
            }
            (Constraint::NonEmpty, FieldValue::Str(s)) => {
                if s.trim().is_empty() {
                    return Err(ValidationError::Empty { field: self.field });
                }
            }
            (Constraint::NonEmpty, FieldValue::Int(_)) => {}
            (Constraint::OneOf(allowed), FieldValue::Str(s)) => {
                if !allowed.iter().any(|a| a.eq_ignore_ascii_case(s)) {
                    return Err(ValidationError::NotAllowed {
                        field: self.field,
                        allowed,
                        value: s.to_string(),
                    });
                }
            }
            (Constraint::OneOf(allowed), FieldValue::Int(v)) => {
                let v = v.to_string();
                if !allowed.contains(&v.as_str()) {
                    return Err(ValidationError::NotAllowed {
                        field: self.field,
                        allowed,
                        value: v,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Checks `target` against every rule in order and stops at the first violation.
pub fn validate<T>(target: &T, rules: &[FieldRule<T>]) -> Result<(), ValidationError> {
    for rule in rules {
        rule.check(target)?;
    }
    Ok(())
}
