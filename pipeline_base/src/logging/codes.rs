//! Consolidated log and error codes
//!
//! Single source of truth for every code the pipeline emits, together with the
//! metadata attached to structured error lines.

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// CODE WRAPPER TYPE
// ============================================================================

/// Universal code wrapper for both error and success codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Code(&'static str);

impl Code {
    pub const fn new(code: &'static str) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ERROR CLASSIFICATION TYPES
// ============================================================================

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Critical = 0,
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "Critical",
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

/// Metadata attached to an error code
#[derive(Debug, Clone)]
pub struct ErrorMetadata {
    pub code: &'static str,
    pub category: &'static str,
    pub severity: Severity,
    pub recoverable: bool,
    pub description: &'static str,
}

impl ErrorMetadata {
    pub const fn new(
        code: &'static str,
        category: &'static str,
        severity: Severity,
        recoverable: bool,
        description: &'static str,
    ) -> Self {
        Self {
            code,
            category,
            severity,
            recoverable,
            description,
        }
    }
}

// ============================================================================
// ERROR CODE CONSTANTS
// ============================================================================

/// System error codes
pub mod system {
    use super::Code;

    pub const INTERNAL_ERROR: Code = Code::new("ERR001");
    pub const CONFIGURATION_LOAD_FAILURE: Code = Code::new("ERR002");
    pub const STORE_FAILURE: Code = Code::new("ERR003");
    pub const SERIALIZATION_FAILURE: Code = Code::new("ERR004");
}

/// Registry error codes
pub mod registry {
    use super::Code;

    pub const UNSUPPORTED_KIND: Code = Code::new("E100");
    pub const STRATEGY_NOT_FOUND: Code = Code::new("E101");
    pub const DUPLICATE_STRATEGY: Code = Code::new("E102");
    pub const IMPLEMENTATION_LOAD_FAILURE: Code = Code::new("E103");
    pub const MALFORMED_STRATEGY: Code = Code::new("E104");
    pub const INVALID_MANIFEST: Code = Code::new("E105");
}

/// Factory error codes
pub mod factory {
    use super::Code;

    pub const MISSING_DISCRIMINATOR: Code = Code::new("E120");
    pub const INSTANTIATION_FAILURE: Code = Code::new("E121");
    pub const INVALID_CONFIGURATION: Code = Code::new("E122");
}

/// Strategy execution error codes
pub mod execution {
    use super::Code;

    pub const MISSING_SESSION_DATA: Code = Code::new("E140");
    pub const INVALID_SESSION_DATA: Code = Code::new("E141");
    pub const UNSUPPORTED_OPERATION: Code = Code::new("E142");
    pub const JOB_NOT_FOUND: Code = Code::new("E143");
    pub const STRATEGY_FAILURE: Code = Code::new("E144");
}

/// Session error codes
pub mod session {
    use super::Code;

    pub const SESSION_NOT_FOUND: Code = Code::new("E160");
    pub const SESSION_KEY_NOT_A_LIST: Code = Code::new("E161");
    pub const INVALID_SESSION_RECORD: Code = Code::new("E162");
}

/// Orchestration error codes
pub mod orchestration {
    use super::Code;

    pub const CONFIG_NOT_FOUND: Code = Code::new("E180");
    pub const PIPELINE_STEP_FAILED: Code = Code::new("E181");
}

// ============================================================================
// SUCCESS CODE CONSTANTS
// ============================================================================

/// Success codes
pub mod success {
    use super::Code;

    pub const REGISTRY_LOADED: Code = Code::new("I001");
    pub const IMPLEMENTATION_RESOLVED: Code = Code::new("I002");
    pub const STRATEGY_CREATED: Code = Code::new("I003");
    pub const SESSION_CREATED: Code = Code::new("I010");
    pub const SESSION_UPDATED: Code = Code::new("I011");
    pub const SESSION_DELETED: Code = Code::new("I012");
    pub const CONFIG_REGISTERED: Code = Code::new("I020");
    pub const PIPELINE_STEP_COMPLETED: Code = Code::new("I021");
}

// ============================================================================
// ERROR METADATA REGISTRY
// ============================================================================

static ERROR_REGISTRY: OnceLock<HashMap<&'static str, ErrorMetadata>> = OnceLock::new();

fn get_error_registry() -> &'static HashMap<&'static str, ErrorMetadata> {
    ERROR_REGISTRY.get_or_init(|| {
        let entries = [
            ErrorMetadata::new("ERR001", "System", Severity::Critical, false, "Internal error"),
            ErrorMetadata::new(
                "ERR002",
                "System",
                Severity::Critical,
                false,
                "Service configuration could not be loaded",
            ),
            ErrorMetadata::new("ERR003", "System", Severity::High, true, "Key/value store failure"),
            ErrorMetadata::new(
                "ERR004",
                "System",
                Severity::High,
                false,
                "Value could not be serialized for the store",
            ),
            ErrorMetadata::new("E100", "Registry", Severity::Medium, true, "Unknown strategy kind"),
            ErrorMetadata::new(
                "E101",
                "Registry",
                Severity::Medium,
                true,
                "No strategy registered for discriminator value",
            ),
            ErrorMetadata::new(
                "E102",
                "Registry",
                Severity::Critical,
                false,
                "Two plugins registered the same kind and discriminator value",
            ),
            ErrorMetadata::new(
                "E103",
                "Registry",
                Severity::High,
                false,
                "Strategy implementation could not be loaded",
            ),
            ErrorMetadata::new(
                "E104",
                "Registry",
                Severity::High,
                false,
                "Strategy implementation does not satisfy its kind contract",
            ),
            ErrorMetadata::new("E105", "Registry", Severity::Critical, false, "Invalid plugin manifest"),
            ErrorMetadata::new(
                "E120",
                "Factory",
                Severity::Medium,
                true,
                "Configuration has no discriminator value for the requested kind",
            ),
            ErrorMetadata::new(
                "E121",
                "Factory",
                Severity::High,
                false,
                "Strategy implementation refused the configuration",
            ),
            ErrorMetadata::new("E122", "Factory", Severity::Medium, true, "Invalid configuration"),
            ErrorMetadata::new(
                "E140",
                "Execution",
                Severity::Medium,
                true,
                "Session is missing data required by the strategy",
            ),
            ErrorMetadata::new(
                "E141",
                "Execution",
                Severity::Medium,
                true,
                "Session data has an unexpected shape",
            ),
            ErrorMetadata::new(
                "E142",
                "Execution",
                Severity::Medium,
                true,
                "Operation not supported by strategy kind",
            ),
            ErrorMetadata::new("E143", "Execution", Severity::Low, true, "Unknown job identifier"),
            ErrorMetadata::new("E144", "Execution", Severity::High, true, "Strategy execution failed"),
            ErrorMetadata::new("E160", "Session", Severity::Medium, true, "Session not found"),
            ErrorMetadata::new(
                "E161",
                "Session",
                Severity::Medium,
                true,
                "Session key exists but does not hold a list",
            ),
            ErrorMetadata::new(
                "E162",
                "Session",
                Severity::High,
                false,
                "Persisted session record is not a JSON object",
            ),
            ErrorMetadata::new("E180", "Orchestration", Severity::Medium, true, "Configuration not found"),
            ErrorMetadata::new(
                "E181",
                "Orchestration",
                Severity::Medium,
                true,
                "Pipeline run aborted at a failing step",
            ),
        ];

        entries.into_iter().map(|meta| (meta.code, meta)).collect()
    })
}

/// Look up metadata for a code
pub fn get_metadata(code: &str) -> Option<&'static ErrorMetadata> {
    get_error_registry().get(code)
}

/// Category of a code
pub fn get_category(code: &str) -> &'static str {
    get_metadata(code)
        .map(|meta| meta.category)
        .unwrap_or("Unknown")
}
