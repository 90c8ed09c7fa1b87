//! Certificate expiry helpers

use chrono::{DateTime, Utc};
use x509_parser::pem::Pem;

/// Date format used in certificate display names
const EXPIRY_FORMAT: &str = "%Y-%m-%d";

/// Not-after date of the first parseable `CERTIFICATE` block in a PEM bundle.
pub fn not_after(pem_bundle: &str) -> Option<DateTime<Utc>> {
    for block in Pem::iter_from_buffer(pem_bundle.as_bytes()) {
        let Ok(block) = block else {
            break;
        };
        if block.label != "CERTIFICATE" {
            continue;
        }
        match block.parse_x509() {
            Ok(cert) => {
                return DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0);
            }
            Err(err) => {
                tracing::trace!(error = %err, "skipping unparseable certificate block");
            }
        }
    }
    None
}

/// `"name (Expires: YYYY-MM-DD)"`, or just the name when the expiry is unknown.
pub fn display_name(name: &str, expires: Option<DateTime<Utc>>) -> String {
    match expires {
        Some(at) => format!("{} (Expires: {})", name, at.format(EXPIRY_FORMAT)),
        None => name.to_string(),
    }
}
