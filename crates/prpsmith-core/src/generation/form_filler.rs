//! Fill the project setup form from a free-text description.

use std::sync::Arc;

use tracing::info;

use prpsmith_types::error::ClientError;
use prpsmith_types::prp::{Generated, Origin, ProjectForm};
use prpsmith_types::provider::SessionOverrides;

use super::degrade;
use super::templates::{FORM_SYSTEM_PROMPT, fallback_form, form_user_prompt};
use crate::llm::agent::OutputShape;
use crate::llm::factory::ClientFactory;

pub struct FormFiller {
    factory: Arc<ClientFactory>,
}

impl FormFiller {
    pub fn new(factory: Arc<ClientFactory>) -> Self {
        Self { factory }
    }

    /// Ask the session's provider to fill in a [`ProjectForm`].
    ///
    /// Provider failures (construction, transport, unparsable output) yield
    /// the default form marked as fallback.
    pub async fn fill(
        &self,
        description: &str,
        session: &SessionOverrides,
    ) -> Result<Generated<ProjectForm>, ClientError> {
        info!(description_len = description.len(), "filling project form");
        match self.try_fill(description, session).await {
            Ok(generated) => Ok(generated),
            Err(e) => degrade(e, fallback_form),
        }
    }

    async fn try_fill(
        &self,
        description: &str,
        session: &SessionOverrides,
    ) -> Result<Generated<ProjectForm>, ClientError> {
        let client = self.factory.default_client(session).await?;
        let agent = client.create_agent(
            FORM_SYSTEM_PROMPT,
            OutputShape::of::<ProjectForm>(),
            Vec::new(),
        );
        let run = agent.run(&form_user_prompt(description)).await?;
        let form: ProjectForm = run.decode()?;
        Ok(Generated {
            value: form,
            origin: Origin::Provider {
                provider: run.provider,
                model: run.model,
            },
        })
    }
}
