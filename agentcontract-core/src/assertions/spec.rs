//! Declarative check definitions and their typed form

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A single assertion as authored
///
/// `called_with` reads its expected arguments from `schema`, falling back to
/// `value` when that holds a mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssertionSpec {
    /// Assertion type name, e.g. `contains`
    #[serde(rename = "type")]
    pub kind: String,

    /// Target expression or function name
    #[serde(default)]
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Vec<String>>,
}

impl AssertionSpec {
    pub fn new(kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// A named policy as authored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub name: String,

    /// Policy type name, e.g. `tool_allowlist`
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub target: String,

    /// Functions the policy applies to
    #[serde(default)]
    pub tools: Vec<String>,

    #[serde(default)]
    pub block: Vec<String>,
}

impl PolicySpec {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        tools: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            tools: tools.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }
}

/// Function name from a `tool:` target, or the target itself
fn function_name(target: &str) -> String {
    target.strip_prefix("tool:").unwrap_or(target).to_string()
}

/// Typed assertion, one variant per supported check
///
/// Expected values stay optional here: a missing value is reported as a
/// failing result when the assertion is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Assertion {
    /// Resolved target equals the expected value
    Exact { target: String, expected: Option<Value> },
    /// Expected text occurs in the resolved target
    Contains { target: String, needle: Option<Value> },
    /// Pattern matches anywhere in the resolved target
    Regex { target: String, pattern: Option<Value> },
    /// Resolved target validates against a JSON Schema
    JsonSchema { target: String, schema: Option<Value> },
    /// Function was never called
    NotCalled { function: String },
    /// Some call to the function carried at least these arguments
    CalledWith { function: String, expected: Option<Value> },
    /// Function was called exactly this many times
    CalledCount { function: String, count: Option<Value> },
    /// Type name not recognized
    Unknown { kind: String, target: String },
}

impl Assertion {
    /// Build the typed assertion for a spec
    pub fn from_spec(spec: &AssertionSpec) -> Self {
        let target = spec.target.clone();
        match spec.kind.as_str() {
            "exact" => Self::Exact {
                target,
                expected: spec.value.clone(),
            },
            "contains" => Self::Contains {
                target,
                needle: spec.value.clone(),
            },
            "regex" => Self::Regex {
                target,
                pattern: spec.value.clone(),
            },
            "json_schema" => Self::JsonSchema {
                target,
                schema: spec.schema.clone(),
            },
            "not_called" => Self::NotCalled {
                function: function_name(&target),
            },
            "called_with" => Self::CalledWith {
                function: function_name(&target),
                expected: spec
                    .schema
                    .clone()
                    .or_else(|| spec.value.clone().filter(Value::is_object)),
            },
            "called_count" => Self::CalledCount {
                function: function_name(&target),
                count: spec.value.clone(),
            },
            other => Self::Unknown {
                kind: other.to_string(),
                target,
            },
        }
    }

    /// Type name as authored
    pub fn kind(&self) -> &str {
        match self {
            Self::Exact { .. } => "exact",
            Self::Contains { .. } => "contains",
            Self::Regex { .. } => "regex",
            Self::JsonSchema { .. } => "json_schema",
            Self::NotCalled { .. } => "not_called",
            Self::CalledWith { .. } => "called_with",
            Self::CalledCount { .. } => "called_count",
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// Label identifying this assertion in results, e.g. `contains(final_response)`
    pub fn label(&self) -> String {
        let subject = match self {
            Self::Exact { target, .. }
            | Self::Contains { target, .. }
            | Self::Regex { target, .. }
            | Self::JsonSchema { target, .. }
            | Self::Unknown { target, .. } => target,
            Self::NotCalled { function }
            | Self::CalledWith { function, .. }
            | Self::CalledCount { function, .. } => function,
        };
        format!("{}({})", self.kind(), subject)
    }
}

impl From<&AssertionSpec> for Assertion {
    fn from(spec: &AssertionSpec) -> Self {
        Self::from_spec(spec)
    }
}

/// Typed policy
#[derive(Debug, Clone, PartialEq)]
pub enum Policy {
    /// Only the listed functions may be called
    ToolAllowlist { name: String, tools: Vec<String> },
    /// Each call to a listed function must directly follow a user turn
    RequiresConfirmation { name: String, tools: Vec<String> },
    /// Type name not recognized
    Unknown { name: String, kind: String },
}

impl Policy {
    pub fn from_spec(spec: &PolicySpec) -> Self {
        let name = spec.name.clone();
        match spec.kind.as_str() {
            "tool_allowlist" => Self::ToolAllowlist {
                name,
                tools: spec.tools.clone(),
            },
            "requires_confirmation" => Self::RequiresConfirmation {
                name,
                tools: spec.tools.clone(),
            },
            other => Self::Unknown {
                name,
                kind: other.to_string(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::ToolAllowlist { name, .. }
            | Self::RequiresConfirmation { name, .. }
            | Self::Unknown { name, .. } => name,
        }
    }

    /// Label identifying this policy in results, e.g. `policy:refund_confirm`
    pub fn label(&self) -> String {
        format!("policy:{}", self.name())
    }
}

impl From<&PolicySpec> for Policy {
    fn from(spec: &PolicySpec) -> Self {
        Self::from_spec(spec)
    }
}

/// Assertions and policies evaluated together against one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contract {
    pub assertions: Vec<Assertion>,
    pub policies: Vec<Policy>,
}

impl Contract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contract built from authored specs
    pub fn from_specs(assertions: &[AssertionSpec], policies: &[PolicySpec]) -> Self {
        Self {
            assertions: assertions.iter().map(Assertion::from_spec).collect(),
            policies: policies.iter().map(Policy::from_spec).collect(),
        }
    }

    pub fn with_assertion(mut self, spec: &AssertionSpec) -> Self {
        self.assertions.push(Assertion::from_spec(spec));
        self
    }

    pub fn with_policy(mut self, spec: &PolicySpec) -> Self {
        self.policies.push(Policy::from_spec(spec));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty() && self.policies.is_empty()
    }
}

/// Per-scenario assertions added on top of the defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOverride {
    #[serde(default)]
    pub assertions: Vec<AssertionSpec>,
}

/// Default assertions, per-scenario overrides and global policies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractSuite {
    #[serde(default)]
    pub defaults: Vec<AssertionSpec>,

    /// Keyed by scenario name
    #[serde(default)]
    pub overrides: HashMap<String, ScenarioOverride>,

    #[serde(default)]
    pub policies: Vec<PolicySpec>,
}

impl ContractSuite {
    /// Contract for a scenario: defaults, then its overrides, then every policy
    pub fn contract_for(&self, scenario: &str) -> Contract {
        let mut assertions: Vec<Assertion> = self.defaults.iter().map(Assertion::from_spec).collect();
        if let Some(extra) = self.overrides.get(scenario) {
            assertions.extend(extra.assertions.iter().map(Assertion::from_spec));
        }
        Contract {
            assertions,
            policies: self.policies.iter().map(Policy::from_spec).collect(),
        }
    }
}
