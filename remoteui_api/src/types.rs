use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Login credentials for a device console.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Paths on the console, relative to the device base URL.
///
/// The report paths are templates: `{dummy}` is replaced with a
/// cache-busting timestamp before the request is sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsolePaths {
    pub login_path: String,
    pub top_path: String,
    /// Option value picked for the login form's `domainname` select, when present.
    pub domain: String,
    pub nativetop_path: String,
    pub jstatpri_path: String,
    pub dcounter_path: String,
}

impl Default for ConsolePaths {
    fn default() -> Self {
        Self {
            login_path: "/rps/".to_string(),
            top_path: "/rps/_top.htm".to_string(),
            domain: "localhost".to_string(),
            nativetop_path:
                "/rps/nativetop.cgi?RUIPNxBundle=&CorePGTAG=PGTAG_JOB_PRT_STAT&Dummy={dummy}"
                    .to_string(),
            jstatpri_path:
                "/rps/jstatpri.cgi?Flag=Init_Data&CorePGTAG=1&FromTopPage=1&Dummy={dummy}"
                    .to_string(),
            dcounter_path: "/rps/dcounter.cgi?CorePGTAG=14&Dummy={dummy}".to_string(),
        }
    }
}

/// Time budgets in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    /// Budget for advisory requests.
    pub action_ms: u64,
    /// Budget for login, landing page and the counter report request.
    pub nav_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            action_ms: 2500,
            nav_ms: 12000,
        }
    }
}

impl Timeouts {
    pub fn action(&self) -> Duration {
        Duration::from_millis(self.action_ms)
    }

    pub fn nav(&self) -> Duration {
        Duration::from_millis(self.nav_ms)
    }
}

/// A fetched console page. Any HTTP status is a `Page`; only transport
/// failures are errors.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Replaces every `{dummy}` placeholder in a path template.
pub fn expand_template(template: &str, dummy: i64) -> String {
    template.replace("{dummy}", &dummy.to_string())
}
