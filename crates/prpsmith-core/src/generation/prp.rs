//! PRP document generation.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use prpsmith_types::error::ClientError;
use prpsmith_types::llm::LlmError;
use prpsmith_types::prp::{DetailLevel, Generated, Origin, PrpRequest};
use prpsmith_types::provider::SessionOverrides;

use super::degrade;
use super::templates::{
    COMPREHENSIVE_SECTIONS, PRP_SYSTEM_PROMPT, REQUIRED_SECTIONS, fallback_prp, prp_user_prompt,
};
use crate::llm::agent::OutputShape;
use crate::llm::factory::ClientFactory;

/// Provider output shorter than this (trimmed, in characters) is unusable.
pub const MIN_OUTPUT_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum PrpError {
    #[error("invalid PRP request: {}", .0.join("; "))]
    InvalidInput(Vec<String>),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Parse a detail level, reporting a bad value as an input error.
pub fn parse_detail_level(value: &str) -> Result<DetailLevel, PrpError> {
    value
        .parse()
        .map_err(|e: String| PrpError::InvalidInput(vec![e]))
}

/// Check a request, collecting every problem.
pub fn validate_request(request: &PrpRequest) -> Result<(), PrpError> {
    let mut problems = Vec::new();

    if request.project_name.trim().is_empty() {
        problems.push("project name is required".to_string());
    }
    if request.project_type.trim().is_empty() {
        problems.push("project type is required".to_string());
    }
    if request.detail_level == DetailLevel::Comprehensive {
        if request.description.trim().is_empty() {
            problems.push("a description is required at the comprehensive level".to_string());
        }
        if request.tech_stack.iter().all(|t| t.trim().is_empty()) {
            problems.push("a tech stack is required at the comprehensive level".to_string());
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PrpError::InvalidInput(problems))
    }
}

/// Section headings from `expected` that `document` lacks.
pub fn missing_sections<'a>(document: &str, expected: &[&'a str]) -> Vec<&'a str> {
    expected
        .iter()
        .copied()
        .filter(|section| !document.contains(section))
        .collect()
}

pub struct PrpGenerator {
    factory: Arc<ClientFactory>,
}

impl PrpGenerator {
    pub fn new(factory: Arc<ClientFactory>) -> Self {
        Self { factory }
    }

    /// Generate a PRP document for `request`.
    ///
    /// Invalid input is rejected before any provider call. Provider failures
    /// and unusably short output yield the fallback document for the
    /// request's detail level.
    pub async fn generate(
        &self,
        request: &PrpRequest,
        session: &SessionOverrides,
    ) -> Result<Generated<String>, PrpError> {
        validate_request(request)?;
        info!(
            project = %request.project_name,
            detail_level = %request.detail_level,
            "generating PRP"
        );

        match self.try_generate(request, session).await {
            Ok(generated) => Ok(generated),
            Err(e) => degrade(e, || fallback_prp(request)).map_err(PrpError::from),
        }
    }

    async fn try_generate(
        &self,
        request: &PrpRequest,
        session: &SessionOverrides,
    ) -> Result<Generated<String>, ClientError> {
        let client = self.factory.default_client(session).await?;
        let agent = client.create_agent(PRP_SYSTEM_PROMPT, OutputShape::Text, Vec::new());
        let run = agent.run(&prp_user_prompt(request)).await?;
        let document = run.text();

        let length = document.trim().chars().count();
        if length < MIN_OUTPUT_CHARS {
            return Err(ClientError::Generation {
                provider: run.provider,
                source: LlmError::Provider {
                    message: format!("output too short ({length} characters)"),
                },
            });
        }

        let missing = missing_sections(&document, &REQUIRED_SECTIONS);
        if !missing.is_empty() {
            warn!(missing = ?missing, "generated PRP lacks required sections");
        }
        if request.detail_level == DetailLevel::Comprehensive {
            let missing = missing_sections(&document, &COMPREHENSIVE_SECTIONS);
            if !missing.is_empty() {
                warn!(missing = ?missing, "generated PRP lacks comprehensive sections");
            }
        }

        Ok(Generated {
            value: document,
            origin: Origin::Provider {
                provider: run.provider,
                model: run.model,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::{CannedProvider, factory_with, unconfigured_factory};
    use prpsmith_types::provider::ProviderId;

    fn request(level: DetailLevel) -> PrpRequest {
        PrpRequest {
            project_name: "Ledger".into(),
            project_type: "API/Backend Service".into(),
            description: "double-entry bookkeeping API".into(),
            tech_stack: vec!["Rust".into()],
            requirements: vec![],
            detail_level: level,
        }
    }

    #[test]
    fn test_validation_lists_every_problem() {
        let bad = PrpRequest {
            detail_level: DetailLevel::Comprehensive,
            ..PrpRequest::default()
        };
        match validate_request(&bad) {
            Err(PrpError::InvalidInput(problems)) => assert_eq!(problems.len(), 4),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(validate_request(&request(DetailLevel::Comprehensive)).is_ok());
        assert!(
            validate_request(&PrpRequest {
                project_name: "x".into(),
                project_type: "y".into(),
                ..PrpRequest::default()
            })
            .is_ok()
        );
    }

    #[test]
    fn test_parse_detail_level_rejects_unknown() {
        assert_eq!(parse_detail_level("basic").unwrap(), DetailLevel::Basic);
        let err = parse_detail_level("ultra").unwrap_err();
        assert!(matches!(err, PrpError::InvalidInput(_)));
        assert!(err.to_string().contains("ultra"));
    }

    #[test]
    fn test_missing_sections() {
        let doc = "## Purpose\n...\n## Goal\n...";
        assert_eq!(
            missing_sections(doc, &REQUIRED_SECTIONS),
            vec!["Implementation Blueprint"]
        );
    }

    #[tokio::test]
    async fn test_generate_returns_provider_document() {
        let factory = factory_with(|| {
            CannedProvider::replying(
                "name: \"Ledger\"\n\n## Purpose\nTrack money precisely.\n\n## Goal\nA correct ledger API.\n\n## Implementation Blueprint\n1. Accounts\n2. Journal entries\n",
            )
        });
        let generated = PrpGenerator::new(factory)
            .generate(&request(DetailLevel::Detailed), &SessionOverrides::new())
            .await
            .unwrap();
        assert!(!generated.is_degraded());
        assert!(generated.value.contains("## Implementation Blueprint"));
    }

    #[tokio::test]
    async fn test_short_output_falls_back() {
        let factory = factory_with(|| CannedProvider::replying("too short"));
        let req = request(DetailLevel::Basic);
        let generated = PrpGenerator::new(factory)
            .generate(&req, &SessionOverrides::new())
            .await
            .unwrap();
        assert!(generated.is_degraded());
        assert!(generated.fallback_reason().unwrap().contains("too short"));
        assert_eq!(generated.value, fallback_prp(&req));
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let factory = factory_with(|| CannedProvider::failing("overloaded"));
        let req = request(DetailLevel::Comprehensive);
        let generated = PrpGenerator::new(factory)
            .generate(&req, &SessionOverrides::new())
            .await
            .unwrap();
        assert!(generated.is_degraded());
        assert!(generated.value.contains("Confidence Score"));
    }

    #[tokio::test]
    async fn test_invalid_input_never_calls_provider() {
        let factory = unconfigured_factory();
        let err = PrpGenerator::new(factory)
            .generate(&PrpRequest::default(), &SessionOverrides::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PrpError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_configuration_error_is_returned() {
        let err = PrpGenerator::new(unconfigured_factory())
            .generate(&request(DetailLevel::Basic), &SessionOverrides::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PrpError::Client(ClientError::MissingCredential {
                provider: ProviderId::OpenAi
            })
        ));
    }

    #[tokio::test]
    async fn test_mock_provider_output_is_used() {
        let session = SessionOverrides::new().with_provider(ProviderId::Mock);
        let generated = PrpGenerator::new(unconfigured_factory())
            .generate(&request(DetailLevel::Detailed), &session)
            .await
            .unwrap();
        assert!(!generated.is_degraded());
        assert!(generated.value.starts_with("Mock response for: Write a PRP"));
    }
}
