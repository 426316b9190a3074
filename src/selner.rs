//! The coordinator tying the evaluator to the repository.
//!
//! A session works on a set of selections. Empty selections are ignored and
//! every flow that runs a script needs at least one non-empty selection. The
//! replacements come back in selection order.

use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::{
    config::SelnerConfig,
    eval::{CompiledScript, EvalError, Evaluator, PreviewOutcome},
    repository::{RepositoryError, Script, ScriptRepository},
};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Name is required")]
    NameRequired,

    #[error("\"{0}\" script already exists")]
    AlreadyExists(String),

    #[error("\"{0}\" script not found")]
    ScriptNotFound(String),

    #[error("No selection found")]
    NoSelection,

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

pub struct Selner {
    evaluator: Evaluator,
    repository: ScriptRepository,
}

impl Selner {
    pub fn new(evaluator: Evaluator, repository: ScriptRepository) -> Self {
        Self {
            evaluator,
            repository,
        }
    }

    pub fn from_config(config: SelnerConfig) -> Self {
        let repository = ScriptRepository::from_config(config.repository, &config.storage);
        Self::new(Evaluator::new(config.evaluator), repository)
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn repository(&self) -> &ScriptRepository {
        &self.repository
    }

    /// Live feedback for a script being typed, run against the first
    /// non-empty selection.
    pub fn preview(&self, source: &str, selections: &[String]) -> PreviewOutcome {
        let sample = non_empty(selections).next().unwrap_or_default();
        self.evaluator.preview(source, sample)
    }

    /// Runs an ad-hoc script. Nothing is persisted.
    #[instrument(level = "debug", skip(self, selections))]
    pub fn run_without_saving(
        &self,
        source: &str,
        selections: &[String],
    ) -> CoordinatorResult<Vec<String>> {
        let script = self.evaluator.compile(source)?;
        self.run_all(&script, selections)
    }

    /// Validates and stores a new script, then runs it.
    #[instrument(level = "debug", skip(self, source, description, selections))]
    pub async fn new_script(
        &self,
        name: &str,
        source: &str,
        description: Option<String>,
        selections: &[String],
    ) -> CoordinatorResult<Vec<String>> {
        if name.is_empty() {
            return Err(CoordinatorError::NameRequired);
        }
        if self.repository.get_script(name).await?.is_some() {
            return Err(CoordinatorError::AlreadyExists(name.to_string()));
        }
        if non_empty(selections).next().is_none() {
            return Err(CoordinatorError::NoSelection);
        }

        let compiled = self.evaluator.compile(source)?;
        // another session may have taken the name since the check above
        let created = self
            .repository
            .create_script(Script::new(name, source, description))
            .await?;
        if !created {
            return Err(CoordinatorError::AlreadyExists(name.to_string()));
        }
        info!("Saved script {}", name);

        // saving already marked the script as used
        self.run_all(&compiled, selections)
    }

    /// Runs a stored script and marks it as used if every selection
    /// evaluated successfully.
    #[instrument(level = "debug", skip(self, selections))]
    pub async fn run_stored(
        &self,
        name: &str,
        selections: &[String],
    ) -> CoordinatorResult<Vec<String>> {
        let script = self
            .repository
            .get_script(name)
            .await?
            .ok_or_else(|| CoordinatorError::ScriptNotFound(name.to_string()))?;

        let compiled = self.evaluator.compile(&script.body)?;
        // errors are returned, never written into the selections, and a
        // failed run leaves the recency list untouched
        let replacements = self.run_all(&compiled, selections)?;
        self.repository.record_used(name).await?;
        Ok(replacements)
    }

    pub async fn remove(&self, name: &str) -> CoordinatorResult<()> {
        self.repository.remove_script(name).await?;
        Ok(())
    }

    pub async fn scripts(&self) -> CoordinatorResult<Vec<Script>> {
        Ok(self.repository.list_scripts().await?)
    }

    pub async fn recent(&self) -> CoordinatorResult<Vec<Script>> {
        Ok(self.repository.list_recently_used().await?)
    }

    fn run_all(
        &self,
        script: &CompiledScript,
        selections: &[String],
    ) -> CoordinatorResult<Vec<String>> {
        let inputs: Vec<&str> = non_empty(selections).collect();
        if inputs.is_empty() {
            return Err(CoordinatorError::NoSelection);
        }
        let replacements = inputs
            .into_iter()
            .map(|input| self.evaluator.run(script, input))
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Produced {} replacements", replacements.len());
        Ok(replacements)
    }
}

fn non_empty(selections: &[String]) -> impl Iterator<Item = &str> {
    selections
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
}
