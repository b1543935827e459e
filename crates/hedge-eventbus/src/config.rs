//! Operator status/health HTTP surface configuration.

use serde::{Deserialize, Serialize};

fn default_bind_addr() -> String {
    "0.0.0.0:8090".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}
