use crate::utils::error::{ProvisionError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_min_length(field_name: &str, value: &str, min_length: usize) -> Result<()> {
    let length = value.chars().count();
    if length < min_length {
        return Err(ProvisionError::validation(
            field_name,
            format!(
                "must be at least {} characters long (got {})",
                min_length, length
            ),
        ));
    }
    Ok(())
}

/// 解析埠號字串，必須是數字且介於 1..=65535
pub fn parse_port(field_name: &str, value: &str) -> Result<u16> {
    let trimmed = value.trim();
    let port: u32 = trimmed.parse().map_err(|_| {
        ProvisionError::validation(field_name, format!("'{}' is not a number", value))
    })?;
    validate_range(field_name, port, 1, u16::MAX as u32)?;
    u16::try_from(port)
        .map_err(|_| ProvisionError::validation(field_name, format!("'{}' is out of range", value)))
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ProvisionError::validation(
            field_name,
            "cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_email(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;
    match value.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ProvisionError::validation(
            field_name,
            format!("'{}' is not an email address", value),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ProvisionError::validation(field_name, "path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(ProvisionError::validation(field_name, "path contains null bytes"));
    }

    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(ProvisionError::validation(
            field_name,
            format!("value {} must be between {} and {}", value, min, max),
        ));
    }
    Ok(())
}
