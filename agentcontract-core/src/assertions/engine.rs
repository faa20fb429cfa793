//! Fault-contained evaluation of assertions and policies

use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};

use super::spec::{Assertion, Contract, Policy};
use super::target::{Target, text_form};
use crate::trajectory::{coerce, values_equal, Run, TurnRole};

/// Outcome of one assertion or policy
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    /// Which check produced this, e.g. `contains(final_response)`
    pub label: String,
    pub passed: bool,
    /// Empty when the check passed
    pub message: String,
}

impl CheckResult {
    fn pass(label: &str) -> Self {
        Self {
            label: label.to_string(),
            passed: true,
            message: String::new(),
        }
    }

    fn fail(label: &str, message: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            passed: false,
            message: message.into(),
        }
    }

    fn outcome(label: &str, passed: bool, message: impl FnOnce() -> String) -> Self {
        if passed {
            Self::pass(label)
        } else {
            Self::fail(label, message())
        }
    }
}

/// Every check result for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractResult {
    pub scenario: String,
    pub results: Vec<CheckResult>,
}

impl ContractResult {
    /// True iff every check passed
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    pub fn failures(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Evaluates checks against a finished run
///
/// The engine holds no state and never mutates the run, so one engine can
/// be shared freely. A check that fails for any reason, including an unknown
/// type or a fault while computing it, becomes a failing [`CheckResult`];
/// evaluation always continues with the next check.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertionEngine;

impl AssertionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate assertions, then policies, in order
    pub fn check(&self, run: &Run, assertions: &[Assertion], policies: &[Policy]) -> ContractResult {
        let mut results = Vec::with_capacity(assertions.len() + policies.len());
        results.extend(assertions.iter().map(|a| self.check_assertion(run, a)));
        results.extend(policies.iter().map(|p| self.check_policy(run, p)));

        let result = ContractResult {
            scenario: run.metadata.scenario.clone(),
            results,
        };
        tracing::debug!(
            scenario = %result.scenario,
            checks = result.results.len(),
            failed = result.failed_count(),
            "Contract evaluated"
        );
        result
    }

    pub fn check_contract(&self, run: &Run, contract: &Contract) -> ContractResult {
        self.check(run, &contract.assertions, &contract.policies)
    }

    pub fn check_assertion(&self, run: &Run, assertion: &Assertion) -> CheckResult {
        let label = assertion.label();
        let result = contained(&label, "Assertion error", || evaluate_assertion(run, assertion, &label));
        log_failure(&result);
        result
    }

    pub fn check_policy(&self, run: &Run, policy: &Policy) -> CheckResult {
        let label = policy.label();
        let result = contained(&label, "Policy error", || evaluate_policy(run, policy, &label));
        log_failure(&result);
        result
    }
}

fn log_failure(result: &CheckResult) {
    if !result.passed {
        tracing::debug!(check = %result.label, message = %result.message, "Check failed");
    }
}

/// Run a check, turning a panic inside it into a failing result
fn contained(label: &str, prefix: &str, check: impl FnOnce() -> CheckResult) -> CheckResult {
    match panic::catch_unwind(AssertUnwindSafe(check)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(check = label, %detail, "Check panicked");
            CheckResult::fail(label, format!("{}: {}", prefix, detail))
        }
    }
}

fn resolve(run: &Run, target: &str, label: &str) -> Result<Option<Value>, CheckResult> {
    Target::parse(target)
        .map(|t| t.resolve(run))
        .map_err(|e| CheckResult::fail(label, format!("Assertion error: {}", e)))
}

fn display(value: Option<&Value>) -> String {
    value.map(text_form).unwrap_or_else(|| "null".to_string())
}

fn evaluate_assertion(run: &Run, assertion: &Assertion, label: &str) -> CheckResult {
    match assertion {
        Assertion::Exact { target, expected } => {
            let Some(expected) = expected else {
                return CheckResult::fail(label, "'exact' requires a non-null 'value'");
            };
            let actual = match resolve(run, target, label) {
                Ok(actual) => actual,
                Err(failed) => return failed,
            };
            let matched = actual.as_ref().is_some_and(|actual| values_equal(actual, expected));
            CheckResult::outcome(label, matched, || {
                format!(
                    "Expected exact '{}', got '{}'",
                    text_form(expected),
                    display(actual.as_ref())
                )
            })
        }

        Assertion::Contains { target, needle } => {
            let actual = match resolve(run, target, label) {
                Ok(actual) => actual,
                Err(failed) => return failed,
            };
            let (Some(actual), Some(needle)) = (actual, needle) else {
                return CheckResult::fail(label, format!("Target '{}' resolved to null", target));
            };
            let needle = text_form(needle);
            CheckResult::outcome(label, text_form(&actual).contains(&needle), || {
                format!("'{}' not found in target", needle)
            })
        }

        Assertion::Regex { target, pattern } => {
            let actual = match resolve(run, target, label) {
                Ok(actual) => actual,
                Err(failed) => return failed,
            };
            let (Some(actual), Some(pattern)) = (actual, pattern) else {
                return CheckResult::fail(label, "Target or pattern is null");
            };
            let pattern = text_form(pattern);
            let regex = match regex::Regex::new(&pattern) {
                Ok(regex) => regex,
                Err(e) => return CheckResult::fail(label, format!("Invalid pattern '{}': {}", pattern, e)),
            };
            CheckResult::outcome(label, regex.is_match(&text_form(&actual)), || {
                format!("Pattern '{}' not matched", pattern)
            })
        }

        Assertion::JsonSchema { target, schema } => {
            let actual = match resolve(run, target, label) {
                Ok(actual) => actual,
                Err(failed) => return failed,
            };
            let (Some(actual), Some(schema)) = (actual, schema) else {
                return CheckResult::fail(label, "Target or schema is null");
            };
            let validator = match jsonschema::validator_for(schema) {
                Ok(validator) => validator,
                Err(e) => return CheckResult::fail(label, format!("Invalid schema: {}", e)),
            };
            let first_error = validator.iter_errors(&actual).next().map(|e| e.to_string());
            match first_error {
                None => CheckResult::pass(label),
                Some(message) => CheckResult::fail(label, format!("Schema validation failed: {}", message)),
            }
        }

        Assertion::NotCalled { function } => {
            let called = run.calls_to(function).next().is_some();
            CheckResult::outcome(label, !called, || {
                format!("Tool '{}' was called but should not have been", function)
            })
        }

        Assertion::CalledWith { function, expected } => {
            let Some(expected) = expected else {
                return CheckResult::fail(label, "'called_with' requires expected arguments in 'schema'");
            };
            let Some(expected) = expected.as_object() else {
                return CheckResult::fail(label, "'called_with' expects a mapping of arguments");
            };
            let matched = run.calls_to(function).any(|call| {
                expected
                    .iter()
                    .all(|(key, value)| call.arguments.get(key).is_some_and(|actual| values_equal(actual, value)))
            });
            CheckResult::outcome(label, matched, || {
                format!("Tool '{}' was not called with expected arguments", function)
            })
        }

        Assertion::CalledCount { function, count } => {
            let Some(count) = count else {
                return CheckResult::fail(label, "'called_count' requires an integer 'value'");
            };
            let Some(expected) = coerce::coerce_optional_i64(Some(count)) else {
                return CheckResult::fail(label, "'called_count' expects an integer 'value'");
            };
            let actual = run.calls_to(function).count();
            let passed = i64::try_from(actual).is_ok_and(|actual| actual == expected);
            CheckResult::outcome(label, passed, || {
                format!("Tool '{}' called {} times, expected {}", function, actual, expected)
            })
        }

        Assertion::Unknown { kind, .. } => {
            CheckResult::fail(label, format!("Unknown assertion type: {}", kind))
        }
    }
}

fn evaluate_policy(run: &Run, policy: &Policy, label: &str) -> CheckResult {
    match policy {
        Policy::ToolAllowlist { tools, .. } => {
            let violations: Vec<&str> = run
                .tool_calls()
                .filter(|call| !tools.contains(&call.function))
                .map(|call| call.function.as_str())
                .collect();
            CheckResult::outcome(label, violations.is_empty(), || {
                format!("Disallowed tools called: {}", violations.join(", "))
            })
        }

        Policy::RequiresConfirmation { tools, .. } => {
            for (i, turn) in run.turns.iter().enumerate() {
                let Some(call) = turn.tool_calls.iter().find(|call| tools.contains(&call.function)) else {
                    continue;
                };
                if i == 0 {
                    return CheckResult::fail(
                        label,
                        format!("Tool '{}' called at turn 0 with no prior confirmation", call.function),
                    );
                }
                if run.turns[i - 1].role != TurnRole::User {
                    return CheckResult::fail(
                        label,
                        format!("Tool '{}' at turn {} not preceded by user confirmation", call.function, i),
                    );
                }
            }
            CheckResult::pass(label)
        }

        Policy::Unknown { kind, .. } => CheckResult::fail(label, format!("Unknown policy type: {}", kind)),
    }
}
