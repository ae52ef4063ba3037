//! PRP (Product Requirements Prompt) inputs and agent results.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// How much detail a generated PRP should contain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Basic,
    #[default]
    Detailed,
    Comprehensive,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 3] = [
        DetailLevel::Basic,
        DetailLevel::Detailed,
        DetailLevel::Comprehensive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DetailLevel::Basic => "basic",
            DetailLevel::Detailed => "detailed",
            DetailLevel::Comprehensive => "comprehensive",
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(DetailLevel::Basic),
            "detailed" => Ok(DetailLevel::Detailed),
            "comprehensive" => Ok(DetailLevel::Comprehensive),
            other => Err(format!(
                "invalid detail level: '{other}' (expected basic, detailed or comprehensive)"
            )),
        }
    }
}

/// Project setup form, as filled in from a free-text description.
///
/// Every field defaults to empty so partial model output still decodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ProjectForm {
    pub project_name: String,
    /// One of: Web Application, Mobile App, Desktop Application,
    /// API/Backend Service, Static Website, E-commerce Platform,
    /// Dashboard/Analytics, Marketing Website, Portfolio Website, Blog/CMS, Other.
    pub project_type: String,
    pub description: String,
    pub target_audience: String,
    pub timeline: String,
    pub deployment_target: String,
    pub budget_range: String,
    pub main_goals: Vec<String>,
    pub tech_stack: Vec<String>,
    pub additional_requirements: Vec<String>,
    pub functional_requirements: Vec<String>,
    pub non_functional_requirements: Vec<String>,
    pub technical_requirements: Vec<String>,
    pub constraints: Vec<String>,
}

/// Input for PRP generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrpRequest {
    pub project_name: String,
    pub project_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub detail_level: DetailLevel,
}

/// Where an agent result came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Origin {
    /// Produced by the provider.
    Provider { provider: ProviderId, model: String },
    /// Locally synthesized because the provider call failed.
    Fallback { reason: String },
}

/// An agent result together with its origin.
#[derive(Debug, Clone, Serialize)]
pub struct Generated<T> {
    pub value: T,
    pub origin: Origin,
}

impl<T> Generated<T> {
    /// True when the value is fallback content.
    pub fn is_degraded(&self) -> bool {
        matches!(self.origin, Origin::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.origin {
            Origin::Fallback { reason } => Some(reason),
            Origin::Provider { .. } => None,
        }
    }
}
