//! Core type definitions for genbench

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP methods an endpoint under benchmark may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    /// Get the string representation of the HTTP method
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(ParseError::InvalidHttpMethod(s.to_string())),
        }
    }
}

/// Authorization an endpoint requires from its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Authorization {
    #[default]
    None,
    User,
    Admin,
}

impl Authorization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Authorization::None => "none",
            Authorization::User => "user",
            Authorization::Admin => "admin",
        }
    }
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Authorization {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let normalized = normalized.strip_prefix("role_").unwrap_or(&normalized);
        match normalized {
            "" | "none" | "public" => Ok(Authorization::None),
            "user" => Ok(Authorization::User),
            "admin" => Ok(Authorization::Admin),
            _ => Err(ParseError::InvalidAuthorization(s.to_string())),
        }
    }
}

/// Closed failure taxonomy assigned to every run.
///
/// Declaration order matches the classifier's evaluation order, with
/// `UnknownFailure` and `None` as the two terminal labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorType {
    NoClassFiles,
    CompilationMissingDependency,
    RmiSerialization,
    ExternalToolError,
    Compilation,
    Timeout,
    OutOfMemory,
    RmiConnection,
    ContainerError,
    RuntimeException,
    UnknownFailure,
    None,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::NoClassFiles => "NO_CLASS_FILES",
            ErrorType::CompilationMissingDependency => "COMPILATION_MISSING_DEPENDENCY",
            ErrorType::RmiSerialization => "RMI_SERIALIZATION",
            ErrorType::ExternalToolError => "EXTERNAL_TOOL_ERROR",
            ErrorType::Compilation => "COMPILATION",
            ErrorType::Timeout => "TIMEOUT",
            ErrorType::OutOfMemory => "OUT_OF_MEMORY",
            ErrorType::RmiConnection => "RMI_CONNECTION",
            ErrorType::ContainerError => "CONTAINER_ERROR",
            ErrorType::RuntimeException => "RUNTIME_EXCEPTION",
            ErrorType::UnknownFailure => "UNKNOWN_FAILURE",
            ErrorType::None => "NONE",
        }
    }

    /// Get all labels of the taxonomy
    pub fn all() -> &'static [ErrorType] {
        &[
            ErrorType::NoClassFiles,
            ErrorType::CompilationMissingDependency,
            ErrorType::RmiSerialization,
            ErrorType::ExternalToolError,
            ErrorType::Compilation,
            ErrorType::Timeout,
            ErrorType::OutOfMemory,
            ErrorType::RmiConnection,
            ErrorType::ContainerError,
            ErrorType::RuntimeException,
            ErrorType::UnknownFailure,
            ErrorType::None,
        ]
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, ErrorType::None)
    }

    /// Short human description used in narrative reports
    pub fn description(&self) -> &'static str {
        match self {
            ErrorType::NoClassFiles => "compiled classes missing from the target",
            ErrorType::CompilationMissingDependency => "compilation failed on a missing package",
            ErrorType::RmiSerialization => "framework types could not cross the tool's RMI boundary",
            ErrorType::ExternalToolError => "the tool reported an internal error",
            ErrorType::Compilation => "generated or target sources failed to compile",
            ErrorType::Timeout => "the run exceeded its deadline",
            ErrorType::OutOfMemory => "the tool ran out of memory",
            ErrorType::RmiConnection => "the tool's client/master connection failed",
            ErrorType::ContainerError => "the container runtime failed",
            ErrorType::RuntimeException => "an unhandled runtime exception",
            ErrorType::UnknownFailure => "non-zero exit with no recognised signature",
            ErrorType::None => "no error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ErrorType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        ErrorType::all()
            .iter()
            .copied()
            .find(|label| label.as_str() == wanted)
            .ok_or_else(|| ParseError::InvalidErrorType(s.to_string()))
    }
}

/// Outcome of the generation step, derived solely from the exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationStatus {
    Success,
    Failed,
}

impl GenerationStatus {
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            GenerationStatus::Success
        } else {
            GenerationStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Success => "SUCCESS",
            GenerationStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GenerationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SUCCESS" => Ok(GenerationStatus::Success),
            "FAILED" => Ok(GenerationStatus::Failed),
            _ => Err(ParseError::InvalidGenerationStatus(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_from_str() {
        assert_eq!(HttpMethod::from_str("get").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::from_str(" POST ").unwrap(), HttpMethod::Post);
        assert!(HttpMethod::from_str("FETCH").is_err());
    }

    #[test]
    fn test_authorization_from_str() {
        assert_eq!(Authorization::from_str("ADMIN").unwrap(), Authorization::Admin);
        assert_eq!(Authorization::from_str("ROLE_USER").unwrap(), Authorization::User);
        assert_eq!(Authorization::from_str("").unwrap(), Authorization::None);
        assert!(Authorization::from_str("root").is_err());
    }

    #[test]
    fn test_error_type_round_trips_through_text() {
        for label in ErrorType::all() {
            assert_eq!(ErrorType::from_str(label.as_str()).unwrap(), *label);
            let json = serde_json::to_string(label).unwrap();
            assert_eq!(json, format!("\"{}\"", label.as_str()));
        }
        assert!(ErrorType::from_str("UNKNOWN").is_err());
    }

    #[test]
    fn test_generation_status_follows_exit_code() {
        assert_eq!(GenerationStatus::from_exit_code(0), GenerationStatus::Success);
        assert_eq!(GenerationStatus::from_exit_code(1), GenerationStatus::Failed);
        assert_eq!(GenerationStatus::from_exit_code(124), GenerationStatus::Failed);
    }
}
