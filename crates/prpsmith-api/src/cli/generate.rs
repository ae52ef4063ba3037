//! Generation commands: ask, form, prp.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use prpsmith_core::generation::prp::parse_detail_level;
use prpsmith_types::prp::{ProjectForm, PrpRequest};
use prpsmith_types::provider::SessionOverrides;

use super::{generated_json, spinner, warn_if_degraded};
use crate::state::AppState;

#[derive(Args)]
pub struct PrpArgs {
    /// Project name.
    #[arg(long)]
    pub name: String,

    /// Project type (e.g. "Web Application", "API/Backend Service").
    #[arg(long = "type", value_name = "TYPE")]
    pub project_type: String,

    /// What the project does.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Technologies, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub stack: Vec<String>,

    /// A requirement; repeat for more.
    #[arg(long = "requirement")]
    pub requirements: Vec<String>,

    /// basic, detailed or comprehensive.
    #[arg(long, default_value = "detailed")]
    pub detail: String,

    /// Write the document to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl PrpArgs {
    fn into_request(self) -> Result<(PrpRequest, Option<PathBuf>)> {
        let detail_level = parse_detail_level(&self.detail)?;
        let request = PrpRequest {
            project_name: self.name.trim().to_string(),
            project_type: self.project_type.trim().to_string(),
            description: self.description.trim().to_string(),
            tech_stack: clean(self.stack),
            requirements: clean(self.requirements),
            detail_level,
        };
        Ok((request, self.out))
    }
}

fn clean(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

pub async fn ask(
    state: &AppState,
    prompt: &str,
    session: &SessionOverrides,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let client = state.factory.default_client(session).await?;
    let progress = spinner(&format!("Asking {}...", client.id().display_name()), json || quiet);
    let result = client.generate_response(prompt).await;
    progress.finish_and_clear();
    let answer = result?;

    if json {
        println!(
            "{}",
            serde_json::json!({"provider": client.id(), "model": client.model(), "response": answer})
        );
    } else {
        println!("{answer}");
    }
    Ok(())
}

pub async fn form(
    state: &AppState,
    description: &str,
    session: &SessionOverrides,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let progress = spinner("Filling in the project form...", json || quiet);
    let result = state.form_filler().fill(description, session).await;
    progress.finish_and_clear();
    let generated = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&generated_json(&generated))?);
        return Ok(());
    }

    warn_if_degraded(&generated, quiet);
    println!();
    println!("{}", form_table(&generated.value));
    println!();
    Ok(())
}

fn form_table(form: &ProjectForm) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Field").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);

    let scalars = [
        ("Project name", &form.project_name),
        ("Project type", &form.project_type),
        ("Description", &form.description),
        ("Target audience", &form.target_audience),
        ("Timeline", &form.timeline),
        ("Deployment", &form.deployment_target),
        ("Budget", &form.budget_range),
    ];
    for (label, value) in scalars {
        table.add_row(vec![Cell::new(label).fg(Color::Cyan), Cell::new(value)]);
    }

    let lists = [
        ("Main goals", &form.main_goals),
        ("Tech stack", &form.tech_stack),
        ("Functional", &form.functional_requirements),
        ("Non-functional", &form.non_functional_requirements),
        ("Technical", &form.technical_requirements),
        ("Additional", &form.additional_requirements),
        ("Constraints", &form.constraints),
    ];
    for (label, values) in lists {
        if !values.is_empty() {
            table.add_row(vec![
                Cell::new(label).fg(Color::Cyan),
                Cell::new(values.join("\n")),
            ]);
        }
    }
    table
}

pub async fn prp(
    state: &AppState,
    args: PrpArgs,
    session: &SessionOverrides,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let (request, out) = args.into_request()?;

    let progress = spinner(
        &format!("Generating {} PRP for {}...", request.detail_level, request.project_name),
        json || quiet,
    );
    let result = state.prp_generator().generate(&request, session).await;
    progress.finish_and_clear();
    let generated = result?;

    if let Some(path) = &out {
        tokio::fs::write(path, &generated.value)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if json {
        let mut envelope = generated_json(&generated);
        if let Some(path) = &out {
            envelope["path"] = serde_json::json!(path);
        }
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    warn_if_degraded(&generated, quiet);
    match &out {
        Some(path) if !quiet => println!(
            "  {} PRP written to {}",
            style("✓").green().bold(),
            style(path.display()).cyan()
        ),
        Some(_) => {}
        None => println!("{}", generated.value),
    }
    Ok(())
}
