//! Startup component check.
//!
//! Everything computational is linked into the binary, so the only
//! things that can really be missing are the configuration file and an
//! optional fitted-model backend. The check still lists every component
//! so the console report shows what the run depends on.

use crate::{
    config::CONFIG_FILE,
    error::{ClvError, ClvResult},
    scorer::ModelScorer,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Capability {
    pub name: String,
    pub version: Option<String>,
    pub description: String,
    pub available: bool,
    pub required: bool,
}

impl Capability {
    fn linked(name: &str, description: &str) -> Self {
        Self {
            name: name.into(),
            version: Some(CORE_VERSION.into()),
            description: description.into(),
            available: true,
            required: true,
        }
    }
}

/// Components the demo and the router depend on. The config file is
/// only required when a data directory was asked for.
pub fn standard_capabilities(data_dir: Option<&str>) -> Vec<Capability> {
    let mut caps = vec![
        Capability::linked("clv-core", "Customer generation and aggregation"),
        Capability::linked("formula-scorer", "Closed-form churn and CLV scoring"),
        Capability::linked("seeded-rng", "Deterministic PCG random streams"),
        Capability {
            name: "fitted-model".into(),
            version: None,
            description: "Fitted churn model backend".into(),
            available: ModelScorer::load().is_ok(),
            required: false,
        },
    ];

    if let Some(dir) = data_dir {
        let path = Path::new(dir).join(CONFIG_FILE);
        caps.push(Capability {
            name: "config".into(),
            version: None,
            description: format!("Pipeline configuration ({})", path.display()),
            available: path.is_file(),
            required: true,
        });
    }
    caps
}

/// Fail with `MissingDependency` if any required capability is unavailable.
pub fn check(caps: &[Capability]) -> ClvResult<()> {
    let missing: Vec<String> = caps
        .iter()
        .filter(|c| c.required && !c.available)
        .map(|c| c.name.clone())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ClvError::MissingDependency { missing })
    }
}
