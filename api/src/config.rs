// ./api/src/config.rs
use infrastructure::StoreKind;
use std::env;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COMPANY_NAME: &str = "NewCo";

const PORT_VAR: &str = "PORT";
const DB_TYPE_VAR: &str = "EMPLOYEE_DB_TYPE";
const COMPANY_NAME_VAR: &str = "EMPLOYEE_COMPANY_NAME";
const CONNECTION_VAR: &str = "EMPLOYEE_DB_CONNECTION";

/// Process settings, read once at start-up.
#[derive(Clone)]
pub struct Settings {
    pub port: u16,
    pub store_kind: StoreKind,
    pub company_name: String,
    /// Carries the credential. Redacted from `Debug` output.
    pub connection: Option<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("port", &self.port)
            .field("store_kind", &self.store_kind)
            .field("company_name", &self.company_name)
            .field("connection", &self.connection.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup. Invalid or missing values fall
    /// back to defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup(PORT_VAR) {
            Some(port_str) => match u16::from_str(port_str.trim()) {
                Ok(port_num) => {
                    info!("Using port {} from environment variable {}.", port_num, PORT_VAR);
                    port_num
                }
                Err(_) => {
                    warn!(
                        "Invalid {} value '{}'. Using default port {}.",
                        PORT_VAR, port_str, DEFAULT_PORT
                    );
                    DEFAULT_PORT
                }
            },
            None => {
                info!(
                    "{} environment variable not set. Using default port {}.",
                    PORT_VAR, DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        };

        let store_kind = StoreKind::from_config(lookup(DB_TYPE_VAR).as_deref());

        let company_name = match lookup(COMPANY_NAME_VAR) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            Some(_) => {
                warn!(
                    "Blank {} value. Using default company '{}'.",
                    COMPANY_NAME_VAR, DEFAULT_COMPANY_NAME
                );
                DEFAULT_COMPANY_NAME.to_string()
            }
            None => DEFAULT_COMPANY_NAME.to_string(),
        };

        let connection = lookup(CONNECTION_VAR).filter(|c| !c.trim().is_empty());

        Self {
            port,
            store_kind,
            company_name,
            connection,
        }
    }
}
