//! OCSF (Open Cybersecurity Schema Framework) authentication audit events.
//!
//! Events are emitted as JSON via `tracing::info!(target: "ocsf", ...)`.
//! Emission never panics and never includes token values.

use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::origin::Environment;

pub const CLASS_AUTHENTICATION: u32 = 3001;

pub const STATUS_SUCCESS: u32 = 1;
pub const STATUS_FAILURE: u32 = 2;

pub const SEVERITY_INFORMATIONAL: u32 = 1;
pub const SEVERITY_LOW: u32 = 2;
pub const SEVERITY_MEDIUM: u32 = 3;
pub const SEVERITY_HIGH: u32 = 4;

pub const AUTH_PROTOCOL_PASSWORD: u32 = 2;
pub const AUTH_PROTOCOL_OAUTH2: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Logon,
    Logoff,
    /// Session refresh (new access token from a refresh token).
    ServiceTicket,
    /// Account creation and password changes.
    Other,
}

impl Activity {
    fn id(self) -> u32 {
        match self {
            Activity::Logon => 1,
            Activity::Logoff => 2,
            Activity::ServiceTicket => 4,
            Activity::Other => 99,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Activity::Logon => "Logon",
            Activity::Logoff => "Logoff",
            Activity::ServiceTicket => "Service Ticket",
            Activity::Other => "Other",
        }
    }

    fn protocol(self) -> (u32, &'static str) {
        match self {
            Activity::Logon | Activity::Other => (AUTH_PROTOCOL_PASSWORD, "Password"),
            Activity::Logoff | Activity::ServiceTicket => (AUTH_PROTOCOL_OAUTH2, "OAuth 2.0/OIDC"),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn severity_name(id: u32) -> &'static str {
    match id {
        SEVERITY_INFORMATIONAL => "Informational",
        SEVERITY_LOW => "Low",
        SEVERITY_MEDIUM => "Medium",
        SEVERITY_HIGH => "High",
        _ => "Unknown",
    }
}

fn build_event(
    activity: Activity,
    success: bool,
    user_email: Option<&str>,
    environment: Environment,
    message: &str,
) -> Value {
    let (status_id, status, severity_id) = if success {
        (STATUS_SUCCESS, "Success", SEVERITY_INFORMATIONAL)
    } else {
        (STATUS_FAILURE, "Failure", SEVERITY_MEDIUM)
    };
    let (protocol_id, protocol) = activity.protocol();

    let mut event = json!({
        "class_uid": CLASS_AUTHENTICATION,
        "class_name": "Authentication",
        "activity_id": activity.id(),
        "activity_name": activity.name(),
        "severity_id": severity_id,
        "severity": severity_name(severity_id),
        "status_id": status_id,
        "status": status,
        "time": now_millis(),
        "metadata": {
            "product": {
                "name": "session-relay",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "environment": environment.as_str(),
        },
        "auth_protocol_id": protocol_id,
        "auth_protocol": protocol,
        "message": message,
    });

    if let Some(email) = user_email {
        event["actor"] = json!({
            "user": {
                "email_addr": email,
                "type_id": 1,
                "type": "User"
            }
        });
    }
    event
}

/// Emit an OCSF Authentication event.
pub fn authentication_event(
    activity: Activity,
    success: bool,
    user_email: Option<&str>,
    environment: Environment,
    message: &str,
) {
    let event = build_event(activity, success, user_email, environment, message);
    if let Ok(json) = serde_json::to_string(&event) {
        tracing::info!(target: "ocsf", "{}", json);
    }
}
