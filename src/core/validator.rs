use crate::domain::model::{ProvisioningConfig, RawConfig};
use crate::utils::error::Result;
use crate::utils::validation::{
    parse_port, validate_email, validate_min_length, validate_non_empty_string, Validate,
};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Checks user input and produces the typed configuration. Pure: nothing
/// outside the process is touched.
pub fn validate(raw: &RawConfig) -> Result<ProvisioningConfig> {
    validate_non_empty_string("db_user", &raw.db_user)?;
    validate_min_length("db_password", &raw.db_password, MIN_PASSWORD_LENGTH)?;
    validate_email("admin_email", &raw.admin_email)?;
    validate_min_length("admin_password", &raw.admin_password, MIN_PASSWORD_LENGTH)?;
    let db_port = parse_port("db_port", &raw.db_port)?;
    let admin_port = parse_port("admin_port", &raw.admin_port)?;

    Ok(ProvisioningConfig {
        db_user: raw.db_user.clone(),
        db_password: raw.db_password.clone(),
        db_port,
        admin_email: raw.admin_email.clone(),
        admin_password: raw.admin_password.clone(),
        admin_port,
        skip_cleanup: raw.skip_cleanup,
    })
}

impl Validate for RawConfig {
    fn validate(&self) -> Result<()> {
        validate(self).map(|_| ())
    }
}
