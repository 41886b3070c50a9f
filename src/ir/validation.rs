//! Interchange validation.
//!
//! Records arriving as JSON are checked before a graph is assembled from
//! them: names must be well formed, text bounded, and content pointers must
//! stay inside their coordinate space.

use std::sync::OnceLock;

use regex::Regex;

use crate::container::Container;
use crate::error::ValidationError;
use crate::ir::records::GraphRecord;
use crate::pointer::Pointer;
use crate::relation::Relation;
use crate::value::Value;

/// Upper bound for container, relation, end and attribute names.
pub const MAX_NAME_LEN: usize = 256;

/// Upper bound for literal pointers and string values.
pub const MAX_TEXT_LEN: usize = 16 * 1024;

/// Upper bound for the number of containers in one record.
pub const MAX_CONTAINERS: usize = 1 << 20;

const NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_.:-]*$";

static NAME_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn validate_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    if value.len() > MAX_NAME_LEN {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max_length: MAX_NAME_LEN,
        });
    }
    let pattern = NAME_REGEX
        .get_or_init(|| Regex::new(NAME_PATTERN))
        .as_ref()
        .map_err(|e| ValidationError::InvalidConfig {
            reason: format!("name pattern: {e}"),
        })?;
    if !pattern.is_match(value) {
        return Err(ValidationError::InvalidName {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

fn validate_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.len() > MAX_TEXT_LEN {
        return Err(ValidationError::FieldTooLong {
            field: field.to_string(),
            max_length: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

fn validate_pointer(pointer: &Pointer) -> Result<(), ValidationError> {
    match pointer {
        Pointer::Range(r) => {
            validate_text("origin", &r.origin)?;
            if r.start.checked_add(r.length).is_none() {
                return Err(ValidationError::PointerOverflow {
                    origin: r.origin.clone(),
                });
            }
        }
        Pointer::Region(r) => {
            validate_text("origin", &r.origin)?;
            if r.x.checked_add(r.width).is_none() || r.y.checked_add(r.height).is_none() {
                return Err(ValidationError::PointerOverflow {
                    origin: r.origin.clone(),
                });
            }
        }
        Pointer::Container(c) => validate_name("container pointer", &c.name)?,
        Pointer::Relation(rp) => {
            validate_name("relation pointer", &rp.name)?;
            if let Some(end) = &rp.end {
                validate_name("relation pointer end", end)?;
            }
        }
        Pointer::Literal(l) => validate_text("literal", &l.value)?,
    }
    Ok(())
}

impl Relation {
    /// Validates names, pointers and endowments of this relation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("relation name", &self.name)?;
        validate_pointer(&self.relation_type)?;
        for end in &self.ends {
            validate_name("end name", &end.name)?;
            for pointer in &end.pointers {
                validate_pointer(pointer)?;
            }
        }
        for endowment in &self.endowments {
            validate_name("attribute name", &endowment.name)?;
            if let Value::String(s) = &endowment.value {
                validate_text("attribute value", s)?;
            }
        }
        Ok(())
    }
}

impl Container {
    /// Validates this container and every relation annotating it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("container name", &self.name)?;
        if let Some(parent) = &self.parent {
            validate_name("parent", parent)?;
        }
        if let Some(ty) = &self.container_type {
            validate_pointer(ty)?;
        }
        for clip in &self.content {
            validate_pointer(clip)?;
        }
        for relation in &self.annotations {
            relation.validate()?;
        }
        Ok(())
    }
}

impl GraphRecord {
    /// Validates the whole record.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version != Self::CURRENT_VERSION {
            return Err(ValidationError::InvalidConfig {
                reason: format!("unsupported graph record version {}", self.version),
            });
        }
        if self.containers.len() > MAX_CONTAINERS {
            return Err(ValidationError::FieldTooLong {
                field: "containers".to_string(),
                max_length: MAX_CONTAINERS,
            });
        }
        if let Some(defaults) = &self.defaults {
            defaults.validate()?;
        }
        for container in &self.containers {
            container.validate()?;
        }
        Ok(())
    }
}
