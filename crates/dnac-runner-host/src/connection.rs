use semver::Version;
use serde_json::{Map, Value};

use module_core::schema::{DEFAULT_PORT, DEFAULT_USERNAME, DEFAULT_VERSION};

use crate::outcome::{Fault, FaultKind};

/// Connection block shared by every module; extracted from the normalized
/// arguments, never forwarded to endpoint operations.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub verify: bool,
    pub port: u16,
    pub version: Version,
    pub debug: bool,
}

impl ConnectionConfig {
    pub fn from_args(args: &Map<String, Value>) -> Result<Self, Fault> {
        let host = required_str(args, "dnac_host")?;
        let username = optional_str(args, "dnac_username").unwrap_or(DEFAULT_USERNAME);
        let password = required_str(args, "dnac_password")?;
        let verify = optional_bool(args, "dnac_verify").unwrap_or(true);
        let port = match args.get("dnac_port") {
            None => DEFAULT_PORT,
            Some(value) => value
                .as_u64()
                .and_then(|port| u16::try_from(port).ok())
                .ok_or_else(|| {
                    Fault::new(
                        FaultKind::ArgumentInvalid,
                        format!("dnac_port {value} is out of range"),
                    )
                })?,
        };
        let raw_version = optional_str(args, "dnac_version").unwrap_or(DEFAULT_VERSION);
        let version = Version::parse(raw_version).map_err(|err| {
            Fault::new(
                FaultKind::ArgumentInvalid,
                format!("dnac_version `{raw_version}` is not a semantic version: {err}"),
            )
        })?;
        let debug = optional_bool(args, "dnac_debug").unwrap_or(false)
            || env_flag_set("DNAC_RUNNER_DEBUG");
        Ok(Self {
            host: host.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            verify,
            port,
            version,
            debug,
        })
    }
}

fn required_str<'a>(args: &'a Map<String, Value>, name: &str) -> Result<&'a str, Fault> {
    optional_str(args, name).ok_or_else(|| {
        Fault::new(
            FaultKind::ArgumentInvalid,
            format!("connection parameter `{name}` is missing"),
        )
    })
}

fn optional_str<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

fn optional_bool(args: &Map<String, Value>, name: &str) -> Option<bool> {
    args.get(name).and_then(Value::as_bool)
}

fn env_flag_set(key: &str) -> bool {
    std::env::var(key)
        .ok()
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}
