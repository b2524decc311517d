//! JSON reports printed by the CLI

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::Declarations;
use crate::ctor::{resolve_constructor_options, resolve_modified_options, Constructor};
use crate::instance::{InitPhase, Instance, Uid};
use crate::options::{DataMap, StrategyTable};
use crate::perf::PerfMeasure;
use crate::subsystems::{Provided, StateData, Trace};

/// Schema identifier for `inspect` output
pub const INSPECT_SCHEMA_ID: &str = "component-runtime/inspect@1";

/// Schema identifier for `resolve` output
pub const RESOLVE_SCHEMA_ID: &str = "component-runtime/resolve@1";

/// Declaration file the report was built from
#[derive(Debug, Clone, Serialize)]
pub struct SourceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub digest: String,
}

impl SourceInfo {
    pub fn of(declarations: &Declarations) -> Self {
        Self {
            path: declarations
                .path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            digest: declarations.digest.clone(),
        }
    }
}

/// A constructed instance, as printed by `inspect`
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub component: String,
    pub cid: u64,
    pub uid: Uid,
    pub phase: InitPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Construction steps and hook calls, in order
    pub trace: Trace,
    pub data: Value,
    pub provided: Value,
    pub options: Value,
    /// SHA-256 of the JCS-canonical `options`
    pub options_digest: String,
    pub source: SourceInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub perf: Vec<PerfMeasure>,
}

impl InspectReport {
    pub fn build(
        component: &str,
        vm: &Instance,
        source: SourceInfo,
        perf: Vec<PerfMeasure>,
    ) -> Result<Self, ReportError> {
        let options = vm.options().describe();
        let options_digest = snapshot_digest(&options)?;
        let describe_map = |map: Option<&DataMap>| -> Value {
            Value::Object(
                map.into_iter()
                    .flatten()
                    .map(|(k, v)| (k.clone(), v.describe()))
                    .collect(),
            )
        };

        Ok(Self {
            schema_id: INSPECT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            component: component.to_string(),
            cid: vm.constructor().cid(),
            uid: vm.uid(),
            phase: vm.phase(),
            name: vm.name().map(str::to_string),
            trace: vm.extensions().get::<Trace>().cloned().unwrap_or_default(),
            data: describe_map(vm.extensions().get::<StateData>().map(|d| &d.0)),
            provided: describe_map(vm.extensions().get::<Provided>().map(|p| &p.0)),
            options,
            options_digest,
            source,
            perf,
        })
    }

    /// Serialize to JSON
    pub fn to_json(&self, pretty: bool) -> Result<String, ReportError> {
        to_json(self, pretty)
    }
}

/// Constructor options, as printed by `resolve`
#[derive(Debug, Clone, Serialize)]
pub struct ResolveReport {
    pub schema_id: String,
    pub created_at: DateTime<Utc>,
    pub component: String,
    pub cid: u64,
    pub options: Value,
    pub options_digest: String,
    /// Fields patched on the options after declaration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<Value>,
    pub source: SourceInfo,
}

impl ResolveReport {
    /// Resolve `ctor`, noting which fields were patched before resolution
    pub fn build(
        component: &str,
        ctor: &Rc<Constructor>,
        strategies: &StrategyTable,
        source: SourceInfo,
    ) -> Result<Self, ReportError> {
        let modified = resolve_modified_options(ctor).map(|m| m.describe());
        let options = resolve_constructor_options(ctor, strategies);
        let described = options.borrow().describe();
        let options_digest = snapshot_digest(&described)?;
        Ok(Self {
            schema_id: RESOLVE_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            component: component.to_string(),
            cid: ctor.cid(),
            options: described,
            options_digest,
            modified,
            source,
        })
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, ReportError> {
        to_json(self, pretty)
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, ReportError> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.map_err(|e| ReportError::Serialize(e.to_string()))
}

/// SHA-256 over the JCS (RFC 8785) form of `value`
pub fn snapshot_digest(value: &Value) -> Result<String, ReportError> {
    let jcs_bytes =
        serde_json_canonicalizer::to_vec(value).map_err(|e| ReportError::JcsError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&jcs_bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("JCS canonicalization error: {0}")]
    JcsError(String),

    #[error("Serialization error: {0}")]
    Serialize(String),
}
