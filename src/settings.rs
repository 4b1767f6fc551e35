//! Plugin settings supplied by the Mattermost host.
//!
//! A [`Settings`] value is an immutable snapshot: it is built once from the
//! host-supplied JSON and replaced wholesale through the
//! [`ConfigStore`](crate::store::ConfigStore) whenever the host reports a change.

use std::fmt;

use secrecy::{ExposeSecret, Secret};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder written in place of credentials in any outward-facing view.
pub const REDACTED: &str = "n/a";

const DEFAULT_PORT: u16 = 7880;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Malformed plugin settings: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Server profile {key} is malformed: {reason}")]
    Profile { key: String, reason: String },

    #[error("Invalid plugin settings: {0}")]
    Invalid(String),
}

/// LiveKit connection settings.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Settings {
    #[serde(deserialize_with = "lenient_bool")]
    pub secure: bool,
    pub host: String,
    #[serde(deserialize_with = "lenient_u16")]
    pub port: u16,
    #[serde(deserialize_with = "lenient_bool")]
    pub turn_secure: bool,
    pub turn_host: String,
    #[serde(deserialize_with = "lenient_u16")]
    pub turn_port: u16,
    #[serde(rename = "TurnUDP", deserialize_with = "lenient_u16")]
    pub turn_udp_port: u16,
    pub api_key: Secret<String>,
    pub api_secret: Secret<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            secure: false,
            host: String::new(),
            port: DEFAULT_PORT,
            turn_secure: false,
            turn_host: String::new(),
            turn_port: 0,
            turn_udp_port: 0,
            api_key: Secret::new(String::new()),
            api_secret: Secret::new(String::new()),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("secure", &self.secure)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("turn_secure", &self.turn_secure)
            .field("turn_host", &self.turn_host)
            .field("turn_port", &self.turn_port)
            .field("turn_udp_port", &self.turn_udp_port)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// One `ServerN` profile, as typed into the System Console.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerProfile {
    #[serde(deserialize_with = "lenient_bool")]
    secure: bool,
    host: String,
    #[serde(deserialize_with = "lenient_u16")]
    port: u16,
    #[serde(deserialize_with = "lenient_bool")]
    turnsecure: bool,
    turnhost: String,
    #[serde(deserialize_with = "lenient_u16")]
    turnport: u16,
    #[serde(deserialize_with = "lenient_u16")]
    turnudp: u16,
    apikey: String,
    apivalue: String,
}

impl From<ServerProfile> for Settings {
    fn from(p: ServerProfile) -> Self {
        Self {
            secure: p.secure,
            host: p.host,
            port: if p.port == 0 { DEFAULT_PORT } else { p.port },
            turn_secure: p.turnsecure,
            turn_host: p.turnhost,
            turn_port: p.turnport,
            turn_udp_port: p.turnudp,
            api_key: Secret::new(p.apikey),
            api_secret: Secret::new(p.apivalue),
        }
    }
}

impl Settings {
    /// Build a snapshot from the plugin's section of the host configuration.
    ///
    /// Accepts either the flat form (`{"Host": ..., "ApiKey": ...}`) or named
    /// server profiles (`{"Server1": "{host: 'lk.example.com', ...}"}`), in
    /// which case the lowest-numbered profile that parses wins. An empty port
    /// means the LiveKit default in both forms.
    pub fn from_host_settings(value: &Value) -> Result<Self, SettingsError> {
        let Some(object) = value.as_object() else {
            if value.is_null() {
                return Ok(Self::default());
            }
            return Ok(serde_json::from_value(value.clone())?);
        };

        let mut profiles: Vec<(u32, &str, &str)> = object
            .iter()
            .filter_map(|(key, raw)| {
                let index = key
                    .to_ascii_lowercase()
                    .strip_prefix("server")?
                    .parse::<u32>()
                    .ok()?;
                let raw = raw.as_str()?.trim();
                (!raw.is_empty()).then_some((index, key.as_str(), raw))
            })
            .collect();

        if profiles.is_empty() {
            let mut settings: Self =
                serde_json::from_value(Value::Object(canonical_keys(object)))?;
            if settings.port == 0 {
                settings.port = DEFAULT_PORT;
            }
            return Ok(settings);
        }

        profiles.sort_by_key(|(index, _, _)| *index);
        let mut first_error = None;
        for (_, key, raw) in profiles {
            match serde_json::from_str::<ServerProfile>(&relax_json(raw)) {
                Ok(profile) => {
                    tracing::debug!(profile = key, "server profile selected");
                    return Ok(profile.into());
                }
                Err(e) => {
                    tracing::warn!(profile = key, error = %e, "skipping malformed server profile");
                    first_error.get_or_insert(SettingsError::Profile {
                        key: key.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(first_error.unwrap_or_else(|| SettingsError::Invalid("no server profile".to_string())))
    }

    /// Check the fields the integration cannot work without.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("Host");
        }
        if self.port == 0 {
            missing.push("Port");
        }
        if self.api_key.expose_secret().is_empty() {
            missing.push("ApiKey");
        }
        if self.api_secret.expose_secret().is_empty() {
            missing.push("ApiSecret");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Invalid(format!(
                "missing {}",
                missing.join(", ")
            )))
        }
    }

    /// WebSocket URL clients use to reach the signaling server.
    pub fn signaling_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Base URL of the LiveKit server API.
    pub fn service_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    pub fn turn_url(&self) -> Option<String> {
        if self.turn_host.is_empty() {
            return None;
        }
        let scheme = if self.turn_secure { "turns" } else { "turn" };
        Some(format!("{}:{}:{}", scheme, self.turn_host, self.turn_port))
    }

    /// The same settings with credentials replaced by [`REDACTED`].
    pub fn redacted(&self) -> RedactedSettings {
        RedactedSettings {
            secure: self.secure,
            host: self.host.clone(),
            port: self.port,
            turn_secure: self.turn_secure,
            turn_host: self.turn_host.clone(),
            turn_port: self.turn_port,
            turn_udp_port: self.turn_udp_port,
            api_key: REDACTED,
            api_secret: REDACTED,
            url: self.signaling_url(),
            turn_url: self.turn_url(),
        }
    }
}

/// Settings as exposed to the webapp.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RedactedSettings {
    pub secure: bool,
    pub host: String,
    pub port: u16,
    pub turn_secure: bool,
    pub turn_host: String,
    pub turn_port: u16,
    #[serde(rename = "TurnUDP")]
    pub turn_udp_port: u16,
    pub api_key: &'static str,
    pub api_secret: &'static str,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_url: Option<String>,
}

/// The server stores plugin setting keys lower-cased; older revisions used
/// `TurnName` and `ApiValue`. Map all of them onto the field names.
fn canonical_keys(object: &Map<String, Value>) -> Map<String, Value> {
    object
        .iter()
        .filter_map(|(key, value)| {
            let canonical = match key.to_ascii_lowercase().as_str() {
                "secure" => "Secure",
                "host" => "Host",
                "port" => "Port",
                "turnsecure" => "TurnSecure",
                "turnhost" | "turnname" => "TurnHost",
                "turnport" => "TurnPort",
                "turnudp" | "turnudpport" => "TurnUDP",
                "apikey" => "ApiKey",
                "apisecret" | "apivalue" => "ApiSecret",
                _ => return None,
            };
            Some((canonical.to_string(), value.clone()))
        })
        .collect()
}

/// Rewrite the JavaScript-ish object literals admins tend to paste
/// (`{host: 'x', port: 7880}`) into JSON: single-quoted strings become
/// double-quoted and bare keys get quoted. Valid JSON passes through unchanged.
fn relax_json(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                out.push('"');
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            out.push('\\');
                            if let Some(escaped) = chars.next() {
                                out.push(escaped);
                            }
                        }
                        '"' if c == '\'' => out.push_str("\\\""),
                        q if q == c => break,
                        other => out.push(other),
                    }
                }
                out.push('"');
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let mut lookahead = chars.clone();
                while lookahead.peek().is_some_and(|ch| ch.is_whitespace()) {
                    lookahead.next();
                }
                if lookahead.peek() == Some(&':') {
                    out.push('"');
                    out.push_str(&word);
                    out.push('"');
                } else {
                    out.push_str(&word);
                }
            }
            other => out.push(other),
        }
    }

    out
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "" | "false" | "0" | "no" => Ok(false),
            "true" | "1" | "yes" => Ok(true),
            other => Err(de::Error::custom(format!("expected a boolean, got {other:?}"))),
        },
        other => Err(de::Error::custom(format!("expected a boolean, got {other}"))),
    }
}

fn lenient_u16<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| de::Error::custom(format!("port out of range: {n}"))),
        Value::Null => Ok(0),
        Value::String(s) if s.trim().is_empty() => Ok(0),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a port number, got {s:?}"))),
        other => Err(de::Error::custom(format!("expected a port number, got {other}"))),
    }
}
