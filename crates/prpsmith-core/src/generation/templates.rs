//! Prompt text and deterministic fallback documents.
//!
//! Fallback output depends only on its inputs (no clock, no randomness), so
//! the same request always degrades to the same document.

use prpsmith_types::prp::{DetailLevel, ProjectForm, PrpRequest};

pub const FORM_SYSTEM_PROMPT: &str = "\
You are a project intake specialist. Read the project description and fill in \
the project setup form.

Rules:
1. Fill every field; infer what the description does not state.
2. project_type is one of: Web Application, Mobile App, Desktop Application, \
API/Backend Service, Static Website, E-commerce Platform, Dashboard/Analytics, \
Marketing Website, Portfolio Website, Blog/CMS, Other.
3. timeline is one of: 1-2 weeks, 2-3 weeks, 1-2 months, 2-3 months, 3-6 months, 6+ months.
4. deployment_target is one of: Vercel, Netlify, AWS, Google Cloud, Azure, Heroku, \
DigitalOcean, Self-hosted, Other.
5. budget_range is one of: Personal project, Small (< $1K), Medium ($1K - $10K), \
Large ($10K+), Enterprise.
6. Pick a popular, coherent tech stack.
7. Answer with JSON only.";

pub const PRP_SYSTEM_PROMPT: &str = "\
You are a Product Requirements Prompt (PRP) specialist. Turn the project \
information into a PRP document that an AI coding assistant can implement \
end to end.

Use this layout (Markdown):
name: \"<project name>\"
description: |
## Purpose
## Core Principles
## Goal
## Why
## What
### Success Criteria
## All Needed Context
### Documentation & References
### Current Codebase tree
### Desired Codebase tree with files to be added
### Known Gotchas & Library Quirks
## Implementation Blueprint
### Data models and structure
### List of tasks to be completed
### Per task pseudocode
### Integration Points
## Validation Loop
### Level 1: Syntax & Style
### Level 2: Unit Tests
### Level 3: Integration Test
## Final validation Checklist
## Anti-Patterns to Avoid
## Confidence Score

Answer with the document only.";

/// Sections every generated PRP is expected to contain.
pub const REQUIRED_SECTIONS: [&str; 3] = ["Purpose", "Goal", "Implementation Blueprint"];

/// Extra sections expected at the comprehensive level.
pub const COMPREHENSIVE_SECTIONS: [&str; 4] = [
    "All Needed Context",
    "Validation Loop",
    "Anti-Patterns",
    "Confidence Score",
];

pub fn form_user_prompt(description: &str) -> String {
    format!(
        "Fill in the project setup form for this project description.\n\n\
         PROJECT DESCRIPTION:\n{description}"
    )
}

pub fn prp_user_prompt(request: &PrpRequest) -> String {
    let project = serde_json::to_string_pretty(request).unwrap_or_default();
    let level = match request.detail_level {
        DetailLevel::Basic => {
            "DETAIL LEVEL: BASIC\n\
             - Keep it short: Purpose, Goal, Implementation Blueprint and Validation Loop.\n\
             - Keep code examples simple.\n\
             - Stay under 2000 words."
        }
        DetailLevel::Detailed => {
            "DETAIL LEVEL: DETAILED\n\
             - Include every main section of the layout.\n\
             - Add code examples and pseudocode.\n\
             - Spell out test strategy and validation steps."
        }
        DetailLevel::Comprehensive => {
            "DETAIL LEVEL: COMPREHENSIVE\n\
             - Include every section of the layout in full.\n\
             - Give detailed code examples, pseudocode and implementation steps.\n\
             - Cover architecture patterns, integration points and deployment.\n\
             - Expand the anti-patterns and gotchas sections."
        }
    };
    format!("Write a PRP for this project.\n\nPROJECT:\n{project}\n\n{level}")
}

/// Form returned when the provider cannot fill one in.
pub fn fallback_form() -> ProjectForm {
    let list = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    ProjectForm {
        project_name: "New Project".into(),
        project_type: "Web Application".into(),
        description: "Modern web application project".into(),
        target_audience: "General users".into(),
        timeline: "1-2 months".into(),
        deployment_target: "Vercel".into(),
        budget_range: "Personal project".into(),
        main_goals: list(&["User-friendly interface", "Fast performance", "Secure system"]),
        tech_stack: list(&["React", "Node.js", "PostgreSQL"]),
        additional_requirements: list(&["Responsive design", "SEO optimization"]),
        functional_requirements: list(&[
            "User registration and login",
            "Viewing and editing data",
            "Search and filtering",
        ]),
        non_functional_requirements: list(&[
            "Page load under 3 seconds",
            "Mobile-friendly layout",
            "Encrypted data transport",
        ]),
        technical_requirements: list(&[
            "Modern web technologies",
            "API-based architecture",
            "Database optimization",
        ]),
        constraints: list(&["Limited budget", "Fast delivery"]),
    }
}

/// Document returned when the provider cannot produce a PRP.
pub fn fallback_prp(request: &PrpRequest) -> String {
    let name = non_empty(&request.project_name, "New Project");
    let kind = non_empty(&request.project_type, "Web Application");
    let description = non_empty(&request.description, "A modern application");
    let slug = name.to_lowercase().replace(' ', "_");

    match request.detail_level {
        DetailLevel::Basic => basic_prp(name, kind, description, &slug),
        DetailLevel::Detailed => detailed_prp(name, kind, description, request),
        DetailLevel::Comprehensive => comprehensive_prp(name, kind, description, &slug, request),
    }
}

fn non_empty<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() { default } else { value }
}

fn bullets(items: &[String], default: &[&str]) -> String {
    let lines: Vec<String> = if items.is_empty() {
        default.iter().map(|s| format!("- {s}")).collect()
    } else {
        items.iter().map(|s| format!("- {s}")).collect()
    };
    lines.join("\n")
}

fn basic_prp(name: &str, kind: &str, description: &str, slug: &str) -> String {
    format!(
        r#"name: "{name}"
description: |

## Purpose
Build {description} and cover its core needs.

## Goal
Ship a simple, usable {kind}.

## Implementation Blueprint

### Basic Structure
```
{slug}/
├── src/
├── tests/
└── README.md
```

### Core Tasks
1. **Setup**: create the project structure
2. **Development**: implement the core functions
3. **Testing**: write basic tests
4. **Documentation**: write the README

## Validation Loop

### Basic Checks
- Syntax and lint checks
- Basic unit tests
- Manual functionality check
"#
    )
}

fn core_principles() -> &'static str {
    "## Core Principles
1. **Context is King**: Include ALL necessary documentation, examples, and caveats
2. **Validation Loops**: Provide executable tests/lints the AI can run and fix
3. **Information Dense**: Use keywords and patterns from the codebase
4. **Progressive Success**: Start simple, validate, then enhance"
}

fn detailed_prp(name: &str, kind: &str, description: &str, request: &PrpRequest) -> String {
    let stack = bullets(&request.tech_stack, &["To be decided"]);
    let requirements = bullets(&request.requirements, &["All functional requirements are met"]);
    format!(
        r#"name: "{name}"
description: |

## Purpose
Build {description} and deliver value to its users.

{principles}

---

## Goal
Build a user-friendly, scalable {kind}.

## Why
- **Business value**: meets user needs and streamlines workflows
- **Integration**: fits a modern technology stack
- **Problems solved**: automates today's manual steps

## What
{description}

### Tech Stack
{stack}

### Success Criteria
{requirements}
- [ ] Performance tests pass
- [ ] Security checks pass

## All Needed Context

### Known Gotchas & Library Quirks
- CRITICAL: handle async operations and their failures explicitly
- CRITICAL: validate user input before processing
- CRITICAL: keep secrets in environment variables

## Implementation Blueprint

### List of tasks to be completed
```yaml
Task 1: Setup Project Structure
  - Create directories, configuration and base files

Task 2: Implement Core Features
  - Implement the main functionality feature by feature

Task 3: Tests and Documentation
  - Cover every feature with tests and document setup
```

## Validation Loop

### Level 1: Syntax & Style
- Run the formatter and linter; fix every finding

### Level 2: Unit Tests
- Test each feature's happy path, edge cases and failures

### Level 3: Integration Test
- Exercise the running application end to end
"#,
        principles = core_principles(),
    )
}

fn comprehensive_prp(
    name: &str,
    kind: &str,
    description: &str,
    slug: &str,
    request: &PrpRequest,
) -> String {
    let stack = bullets(&request.tech_stack, &["To be decided"]);
    let requirements = bullets(&request.requirements, &["All functional requirements are met"]);
    format!(
        r#"name: "{name}"
description: |

## Purpose
Build {description} with maximum value for its users, following modern engineering standards for a scalable, maintainable result.

{principles}

---

## Goal
Build an enterprise-grade, user-friendly, high-performance {kind}.

## Why
- **Business value**: meets user needs and streamlines workflows
- **Integration**: fits a modern technology stack
- **Problems solved**: automates manual steps and raises efficiency

## What
{description}

### Tech Stack
{stack}

### Success Criteria
{requirements}
- [ ] Performance benchmarks pass
- [ ] Security audit complete
- [ ] Scalability tests pass
- [ ] Production deployment ready

## All Needed Context

### Documentation & References
```yaml
- file: README.md
  why: Project setup and usage
- file: .env.example
  why: Required configuration
```

### Current Codebase tree
```bash
{slug}/
├── src/
├── tests/
└── README.md
```

### Desired Codebase tree with files to be added
```bash
{slug}/
├── src/
│   ├── api/
│   ├── services/
│   └── database/
├── tests/
│   ├── unit/
│   ├── integration/
│   └── e2e/
├── deployment/
└── docs/
```

### Known Gotchas & Library Quirks
- CRITICAL: use parameterized queries only
- CRITICAL: close connections and release resources on every path
- CRITICAL: never log secrets

## Implementation Blueprint

### Data models and structure
Define one model per domain entity with explicit validation.

### List of tasks to be completed
```yaml
Task 1: Project skeleton and configuration
Task 2: Data layer and migrations
Task 3: Service layer
Task 4: API layer
Task 5: Frontend integration
Task 6: Deployment and monitoring
```

### Integration Points
```yaml
ENVIRONMENT:
  - add to: .env
DATABASE:
  - migrations under src/database
```

## Validation Loop

### Level 1: Syntax & Style
- Run the formatter and linter; fix every finding

### Level 2: Unit Tests
- Test each service's happy path, edge cases and failures

### Level 3: Integration Test
- Exercise the API end to end against a test database

## Final validation Checklist
- [ ] All tests pass
- [ ] No lint errors
- [ ] Documentation updated

## Anti-Patterns to Avoid
- Do not skip validation because "it should work"
- Do not hardcode values that belong in configuration
- Do not catch all errors without handling them

## Confidence Score
7/10 (fallback document; review before implementing)
"#,
        principles = core_principles(),
    )
}
