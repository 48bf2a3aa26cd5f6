//! Prompt templates for the agents.
//!
//! Defaults are compiled in from `prompts/*.md`. A deployment may override any
//! of them with a same-named file in its prompts directory.

use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_LANGUAGE: &str = "Spanish";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKey {
    Architect,
    ProducerTheory,
    ProducerDrill,
    ProducerScenario,
    ActorSystem,
    Analyst,
}

impl PromptKey {
    pub const ALL: [PromptKey; 6] = [
        PromptKey::Architect,
        PromptKey::ProducerTheory,
        PromptKey::ProducerDrill,
        PromptKey::ProducerScenario,
        PromptKey::ActorSystem,
        PromptKey::Analyst,
    ];

    /// File stem of the template.
    pub fn name(self) -> &'static str {
        match self {
            PromptKey::Architect => "architect",
            PromptKey::ProducerTheory => "producer_theory",
            PromptKey::ProducerDrill => "producer_drill",
            PromptKey::ProducerScenario => "producer_scenario",
            PromptKey::ActorSystem => "actor_system",
            PromptKey::Analyst => "analyst",
        }
    }

    fn default_template(self) -> &'static str {
        match self {
            PromptKey::Architect => include_str!("../prompts/architect.md"),
            PromptKey::ProducerTheory => include_str!("../prompts/producer_theory.md"),
            PromptKey::ProducerDrill => include_str!("../prompts/producer_drill.md"),
            PromptKey::ProducerScenario => include_str!("../prompts/producer_scenario.md"),
            PromptKey::ActorSystem => include_str!("../prompts/actor_system.md"),
            PromptKey::Analyst => include_str!("../prompts/analyst.md"),
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.name() == name)
    }
}

#[derive(Debug, Clone)]
pub struct PromptBook {
    templates: HashMap<PromptKey, String>,
    language: String,
}

impl PromptBook {
    /// The compiled-in templates, generating content in `language`.
    pub fn new(language: impl Into<String>) -> Self {
        let templates = PromptKey::ALL
            .into_iter()
            .map(|key| (key, key.default_template().to_string()))
            .collect();
        Self {
            templates,
            language: language.into(),
        }
    }

    /// Replaces defaults with the given templates, keyed by file stem.
    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        for (name, template) in overrides {
            match PromptKey::from_name(&name) {
                Some(key) => {
                    info!(prompt = %name, "Using prompt override");
                    self.templates.insert(key, template);
                }
                None => warn!(prompt = %name, "Ignoring unknown prompt file"),
            }
        }
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Fills `{name}` placeholders in one pass; substituted text is never re-scanned.
    ///
    /// `{language}` is always available. Any other placeholder must be supplied.
    pub fn render(&self, key: PromptKey, vars: &[(&str, &str)]) -> CoreResult<String> {
        let template = self
            .templates
            .get(&key)
            .ok_or_else(|| CoreError::Generation(format!("missing prompt '{}'", key.name())))?;

        let mut out = String::with_capacity(template.len());
        let mut rest = template.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let placeholder = after
                .find('}')
                .map(|end| &after[..end])
                .filter(|name| is_placeholder(name));

            match placeholder {
                Some(name) => {
                    let value = self.lookup(vars, name).ok_or_else(|| {
                        CoreError::Generation(format!(
                            "prompt '{}' needs a value for '{{{name}}}'",
                            key.name()
                        ))
                    })?;
                    out.push_str(value);
                    rest = &after[name.len() + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    fn lookup<'a>(&'a self, vars: &[(&str, &'a str)], name: &str) -> Option<&'a str> {
        if name == "language" {
            return Some(&self.language);
        }
        vars.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

fn is_placeholder(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

/// Reads every `*.md` file in `prompts_path`, keyed by file stem.
pub fn load_prompt_dir(prompts_path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    for entry in fs::read_dir(prompts_path)
        .with_context(|| format!("Could not read prompts directory {}", prompts_path.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}
