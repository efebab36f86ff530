use crate::domain::model::ProvisioningConfig;
use crate::domain::ports::PortProbe;
use crate::utils::error::{ProvisionError, Result};

/// Returns `candidate` if nothing listens on it, otherwise the next port
/// above it that is free right now. The answer is a snapshot, not a
/// reservation.
pub fn resolve_port<P: PortProbe + ?Sized>(probe: &P, field: &str, candidate: u16) -> Result<u16> {
    let mut port = candidate;
    while probe.is_in_use(port) {
        port = port.checked_add(1).ok_or_else(|| {
            ProvisionError::validation(
                field,
                format!("no free port found between {} and {}", candidate, u16::MAX),
            )
        })?;
    }

    if port != candidate {
        tracing::warn!(
            "⚠️ Port {} for {} is already in use, using {} instead",
            candidate,
            field,
            port
        );
    }

    Ok(port)
}

/// Resolves both published ports independently and returns a new config.
pub fn resolve_ports<P: PortProbe + ?Sized>(
    probe: &P,
    config: &ProvisioningConfig,
) -> Result<ProvisioningConfig> {
    let db_port = resolve_port(probe, "db_port", config.db_port)?;
    let admin_port = resolve_port(probe, "admin_port", config.admin_port)?;
    Ok(config.with_ports(db_port, admin_port))
}
