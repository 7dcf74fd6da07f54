//! Service classes.
//!
//! A service class names one logical backend pool together with its
//! logging and retention policy. The set is closed and fixed at startup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Logical backend group a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceClass {
    Api,
    Ui,
    Wisensys,
    Novus,
    Comet,
    Gprs,
}

impl ServiceClass {
    /// Every class, in configuration order.
    pub const ALL: [ServiceClass; 6] = [
        ServiceClass::Api,
        ServiceClass::Ui,
        ServiceClass::Wisensys,
        ServiceClass::Novus,
        ServiceClass::Comet,
        ServiceClass::Gprs,
    ];

    /// Lowercase name as stored in the log table.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceClass::Api => "api",
            ServiceClass::Ui => "ui",
            ServiceClass::Wisensys => "wisensys",
            ServiceClass::Novus => "novus",
            ServiceClass::Comet => "comet",
            ServiceClass::Gprs => "gprs",
        }
    }

    /// Prefix used for per-class environment overrides (`API_HOST`, ...).
    pub fn env_prefix(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl fmt::Display for ServiceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown service class name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown service class: {0}")]
pub struct UnknownServiceClass(pub String);

impl FromStr for ServiceClass {
    type Err = UnknownServiceClass;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceClass::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownServiceClass(s.to_string()))
    }
}
