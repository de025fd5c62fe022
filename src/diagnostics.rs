//! Local setup check: configuration, model artifacts, customer database, LLM key.

use crate::config::EngineConfig;
use crate::features::FeatureSchema;
use crate::model::{self, ModelHandle};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Values shipped in example env files that are not real keys.
const PLACEHOLDER_KEYS: [&str; 3] = ["your_api_key_here", "changeme", "xxx"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

impl Check {
    fn new(name: &'static str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub generated_at: DateTime<Utc>,
    pub checks: Vec<Check>,
}

impl DiagnosticReport {
    pub fn failures(&self) -> impl Iterator<Item = &Check> {
        self.checks.iter().filter(|c| c.status == CheckStatus::Fail)
    }

    pub fn is_ok(&self) -> bool {
        self.failures().next().is_none()
    }
}

fn file_check(name: &'static str, path: &Path, missing: CheckStatus, what: &str) -> Check {
    if path.is_file() {
        Check::new(name, CheckStatus::Pass, path.display().to_string())
    } else {
        Check::new(name, missing, format!("{} missing ({what})", path.display()))
    }
}

/// Value of `var` as defined in a dotenv file, if the file parses and sets it.
fn dotenv_value(path: &Path, var: &str) -> Option<String> {
    dotenvy::from_path_iter(path)
        .ok()?
        .filter_map(Result::ok)
        .find(|(k, _)| k == var)
        .map(|(_, v)| v)
}

/// A key counts as configured when set, non-blank and not a known placeholder.
pub fn llm_key_configured(value: Option<&str>) -> bool {
    matches!(classify_key(value), CheckStatus::Pass)
}

fn classify_key(value: Option<&str>) -> CheckStatus {
    match value.map(|v| v.trim().trim_matches(|c: char| c == '"' || c == '\'')) {
        None | Some("") => CheckStatus::Warn,
        Some(v) if PLACEHOLDER_KEYS.iter().any(|p| v.eq_ignore_ascii_case(p)) => CheckStatus::Fail,
        Some(_) => CheckStatus::Pass,
    }
}

/// Run every check. `env` resolves environment variables; the configured
/// dotenv file is consulted when the key is not in the environment.
pub fn run<F>(config: &EngineConfig, config_path: &Path, env: F) -> DiagnosticReport
where
    F: Fn(&str) -> Option<String>,
{
    let mut checks = vec![
        file_check("config", config_path, CheckStatus::Warn, "defaults in use"),
        file_check("model", &config.model.model_path, CheckStatus::Fail, "scoring disabled"),
        file_check(
            "model_metadata",
            &config.model.metadata_path,
            CheckStatus::Warn,
            "built-in feature list in use",
        ),
        file_check(
            "customer_database",
            &config.data.customer_db_path,
            CheckStatus::Warn,
            "bulk listings unavailable",
        ),
    ];

    let schema = match model::load_schema(&config.model.metadata_path) {
        Ok(schema) => {
            checks.push(Check::new(
                "schema",
                CheckStatus::Pass,
                format!("{} features", schema.len()),
            ));
            schema
        }
        Err(e) => {
            checks.push(Check::new("schema", CheckStatus::Fail, e.to_string()));
            FeatureSchema::builtin()
        }
    };

    if config.model.model_path.is_file() {
        let handle = ModelHandle::load(&config.model, &schema);
        checks.push(match handle.get() {
            Ok(m) => Check::new("model_load", CheckStatus::Pass, m.name().to_string()),
            Err(e) => Check::new("model_load", CheckStatus::Fail, e.to_string()),
        });
    }

    let var = &config.llm.api_key_env;
    let dotenv = &config.llm.dotenv_path;
    let from_file = dotenv.is_file().then(|| dotenv_value(dotenv, var)).flatten();
    checks.push(match (dotenv.is_file(), &from_file) {
        (false, _) => Check::new(
            "dotenv_file",
            CheckStatus::Warn,
            format!("{} missing (key must come from the environment)", dotenv.display()),
        ),
        (true, None) => Check::new(
            "dotenv_file",
            CheckStatus::Warn,
            format!("{} does not define {var}", dotenv.display()),
        ),
        (true, Some(_)) => Check::new(
            "dotenv_file",
            CheckStatus::Pass,
            format!("{} defines {var}", dotenv.display()),
        ),
    });

    let key = env(var).or(from_file);
    let status = classify_key(key.as_deref());
    let detail = match status {
        CheckStatus::Pass => format!("{var} is set"),
        CheckStatus::Warn => format!("{var} not set; AI drafting disabled"),
        CheckStatus::Fail => format!("{var} still holds a placeholder value"),
    };
    checks.push(Check::new("llm_api_key", status, detail));

    DiagnosticReport {
        generated_at: Utc::now(),
        checks,
    }
}
