//! Input validation and log sanitization.
//!
//! FortiManager object names ride straight into JSON-RPC endpoint URLs, so
//! they are checked against the appliance's documented character sets and
//! length limits before a request is built. Payloads that may carry
//! credentials are passed through [`sanitize_for_logging`] before they are
//! allowed anywhere near the log output.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::error::{FmgError, Result};

// ADOM names: alphanumeric, underscore, hyphen, 1-64 chars.
static ADOM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,64}$").expect("valid pattern"));

// Device names additionally allow dots.
static DEVICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_.-]{1,64}$").expect("valid pattern"));

// Serial numbers start with a Fortinet platform prefix.
static DEVICE_SERIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(FG|FM|FW|FA|FS|FD|FP|FC|FV)[A-Z0-9]{10,20}$").expect("valid pattern")
});

// Firewall object names allow spaces and run up to 79 chars.
static OBJECT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_. -]{1,79}$").expect("valid pattern"));

// Policy package names: 1-35 chars, no spaces.
static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,35}$").expect("valid pattern"));

static IPV4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)$",
    )
    .expect("valid pattern")
});

static IPV4_CIDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)/(?:[0-9]|[1-2][0-9]|3[0-2])$",
    )
    .expect("valid pattern")
});

// Single port, port range, or space-separated list of both.
static PORT_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,5}(-\d{1,5})?(\s+\d{1,5}(-\d{1,5})?)*)$").expect("valid pattern")
});

static FQDN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
        .expect("valid pattern")
});

fn checked(kind: &str, value: &str, pattern: &Regex) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FmgError::Validation(format!("{kind} cannot be empty")));
    }
    if !pattern.is_match(trimmed) {
        return Err(FmgError::Validation(format!(
            "invalid {kind}: {trimmed:?}"
        )));
    }
    Ok(trimmed.to_string())
}

pub fn validate_adom_name(adom: &str) -> Result<String> {
    checked("ADOM name", adom, &ADOM_NAME)
}

pub fn validate_device_name(device: &str) -> Result<String> {
    checked("device name", device, &DEVICE_NAME)
}

pub fn validate_device_serial(serial: &str) -> Result<String> {
    checked("device serial number", serial, &DEVICE_SERIAL)
}

pub fn validate_object_name(name: &str) -> Result<String> {
    checked("object name", name, &OBJECT_NAME)
}

pub fn validate_package_name(name: &str) -> Result<String> {
    checked("package name", name, &PACKAGE_NAME)
}

pub fn validate_ipv4(address: &str) -> Result<String> {
    checked("IPv4 address", address, &IPV4)
}

pub fn validate_ipv4_cidr(subnet: &str) -> Result<String> {
    checked("IPv4 subnet", subnet, &IPV4_CIDR)
}

pub fn validate_port_range(ports: &str) -> Result<String> {
    checked("port range", ports, &PORT_RANGE)
}

pub fn validate_fqdn(fqdn: &str) -> Result<String> {
    checked("FQDN", fqdn, &FQDN)
}

// Keys whose values are masked in logs. Matched as substrings of the
// normalized (lowercased, separators folded to '_') key.
const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "adm_pass",
    "api_token",
    "apikey",
    "token",
    "session",
    "sid",
    "authorization",
    "secret",
    "credential",
];

const MASK: &str = "***REDACTED***";

const MAX_DEPTH: usize = 10;

static HEX_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9]+$").expect("valid pattern"));

fn key_is_sensitive(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace(['-', ' '], "_");
    SENSITIVE_FIELDS
        .iter()
        .any(|field| normalized.contains(field))
}

/// Recursively mask credential-bearing fields and bare hex tokens in a
/// payload before it is logged. Returns a sanitized copy.
pub fn sanitize_for_logging(data: &Value) -> Value {
    sanitize_at_depth(data, 0)
}

fn sanitize_at_depth(data: &Value, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return Value::String("<MAX_DEPTH>".to_string());
    }

    match data {
        Value::Object(map) => {
            let mut sanitized = Map::with_capacity(map.len());
            for (key, value) in map {
                if key_is_sensitive(key) {
                    sanitized.insert(key.clone(), Value::String(MASK.to_string()));
                } else {
                    sanitized.insert(key.clone(), sanitize_at_depth(value, depth + 1));
                }
            }
            Value::Object(sanitized)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| sanitize_at_depth(item, depth + 1))
                .collect(),
        ),
        // Long bare hex strings look like session ids or tokens.
        Value::String(s) if s.len() > 20 && HEX_TOKEN.is_match(s) => {
            Value::String(MASK.to_string())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adom_names() {
        assert_eq!(validate_adom_name(" root ").unwrap(), "root");
        assert!(validate_adom_name("customer-a_01").is_ok());
        assert!(validate_adom_name("").is_err());
        assert!(validate_adom_name("bad/name").is_err());
        assert!(validate_adom_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn device_names_allow_dots() {
        assert!(validate_device_name("fgt-hq.site1").is_ok());
        assert!(validate_adom_name("fgt-hq.site1").is_err());
    }

    #[test]
    fn serial_numbers() {
        assert!(validate_device_serial("FGVM01TM24001234").is_ok());
        assert!(validate_device_serial("XX1234567890AB").is_err());
        assert!(validate_device_serial("FG123").is_err());
    }

    #[test]
    fn object_and_package_names() {
        assert!(validate_object_name("Web Servers 10.0.0.0").is_ok());
        assert!(validate_object_name("no;semicolons").is_err());
        assert!(validate_package_name("branch-pkg_01").is_ok());
        assert!(validate_package_name("has space").is_err());
    }

    #[test]
    fn ipv4_and_cidr() {
        assert!(validate_ipv4("192.168.1.1").is_ok());
        assert!(validate_ipv4("256.1.1.1").is_err());
        assert!(validate_ipv4_cidr("10.0.0.0/8").is_ok());
        assert!(validate_ipv4_cidr("10.0.0.0/33").is_err());
        assert!(validate_ipv4_cidr("10.0.0.0").is_err());
    }

    #[test]
    fn fqdns() {
        assert!(validate_fqdn("www.example.com").is_ok());
        assert!(validate_fqdn("example").is_err());
        assert!(validate_fqdn("-bad.example.com").is_err());
    }

    #[test]
    fn port_ranges() {
        assert!(validate_port_range("443").is_ok());
        assert!(validate_port_range("8000-8080").is_ok());
        assert!(validate_port_range("80 443 8000-8080").is_ok());
        assert!(validate_port_range("http").is_err());
    }

    #[test]
    fn sanitize_masks_sensitive_keys_recursively() {
        let payload = json!({
            "user": "admin",
            "passwd": "secret123",
            "device": {
                "name": "fgt-1",
                "adm_pass": "hunter2",
                "api-token": "abc"
            },
            "scope": [{"session": "xyz"}]
        });

        let sanitized = sanitize_for_logging(&payload);

        assert_eq!(sanitized["user"], json!("admin"));
        assert_eq!(sanitized["passwd"], json!(MASK));
        assert_eq!(sanitized["device"]["name"], json!("fgt-1"));
        assert_eq!(sanitized["device"]["adm_pass"], json!(MASK));
        assert_eq!(sanitized["device"]["api-token"], json!(MASK));
        assert_eq!(sanitized["scope"][0]["session"], json!(MASK));
    }

    #[test]
    fn sanitize_masks_long_hex_tokens() {
        let payload = json!({"value": "a1b2c3d4e5f6a1b2c3d4e5f6"});
        assert_eq!(sanitize_for_logging(&payload)["value"], json!(MASK));

        // Short hex strings and non-hex strings pass through.
        let payload = json!({"value": "deadbeef", "other": "not-hex-but-quite-long-string"});
        let sanitized = sanitize_for_logging(&payload);
        assert_eq!(sanitized["value"], json!("deadbeef"));
        assert_eq!(sanitized["other"], json!("not-hex-but-quite-long-string"));
    }

    #[test]
    fn sanitize_caps_recursion_depth() {
        let mut value = json!("leaf");
        for _ in 0..15 {
            value = json!([value]);
        }
        let sanitized = sanitize_for_logging(&value);
        assert!(sanitized.to_string().contains("<MAX_DEPTH>"));
    }
}
