//! Four-step upload, map, generate, review flow
//!
//! One explicit state object owns the current step and the data gathered so
//! far. Steps only move forward; [`Workflow::restart`] is the only way back.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::WorkflowError;
use crate::mapping::FieldMapping;
use crate::pipeline::{RunOutcome, RunRequest};
use crate::template::Template;

/// Position in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Waiting for the template upload
    Template,
    /// Waiting for the dataset upload
    Dataset,
    /// Reviewing the field mapping, ready to generate
    Mapping,
    /// Results ready for download
    Review,
}

impl Step {
    /// 1-based position, as shown in the step indicator
    pub fn number(self) -> u8 {
        match self {
            Step::Template => 1,
            Step::Dataset => 2,
            Step::Mapping => 3,
            Step::Review => 4,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Template => write!(f, "template"),
            Step::Dataset => write!(f, "dataset"),
            Step::Mapping => write!(f, "mapping"),
            Step::Review => write!(f, "review"),
        }
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    AwaitingTemplate,
    AwaitingDataset {
        template: Template,
    },
    Mapping {
        template: Template,
        dataset: Dataset,
        mapping: FieldMapping,
    },
    Review {
        template: Template,
        dataset: Dataset,
        outcome: RunOutcome,
    },
}

/// What the review step shows before download
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confirmation {
    pub row_count: usize,
    pub template_name: String,
    pub generated: usize,
    pub failed: usize,
    pub analysis_complete: bool,
}

#[derive(Debug, Default)]
pub struct Workflow {
    state: State,
}

impl Workflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        match self.state {
            State::AwaitingTemplate => Step::Template,
            State::AwaitingDataset { .. } => Step::Dataset,
            State::Mapping { .. } => Step::Mapping,
            State::Review { .. } => Step::Review,
        }
    }

    fn wrong_step(&self, expected: Step) -> WorkflowError {
        WorkflowError::WrongStep {
            expected,
            actual: self.step(),
        }
    }

    /// Step 1: accept the template
    pub fn upload_template(&mut self, template: Template) -> Result<(), WorkflowError> {
        if !matches!(self.state, State::AwaitingTemplate) {
            return Err(self.wrong_step(Step::Template));
        }
        debug!(template = template.name(), "Template accepted");
        self.state = State::AwaitingDataset { template };
        Ok(())
    }

    /// Step 2: accept the dataset and compute the default mapping
    pub fn load_dataset(&mut self, dataset: Dataset) -> Result<(), WorkflowError> {
        match std::mem::take(&mut self.state) {
            State::AwaitingDataset { template } => {
                let mapping = FieldMapping::auto(template.fields(), dataset.headers());
                debug!(
                    rows = dataset.len(),
                    mapped = mapping.len(),
                    "Dataset accepted"
                );
                self.state = State::Mapping {
                    template,
                    dataset,
                    mapping,
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.wrong_step(Step::Dataset))
            }
        }
    }

    /// Step 3: override one field's column. Both must exist in the
    /// uploaded template and dataset.
    pub fn assign(&mut self, field: &str, column: &str) -> Result<(), WorkflowError> {
        let expected = self.wrong_step(Step::Mapping);
        match &mut self.state {
            State::Mapping {
                template,
                dataset,
                mapping,
            } => {
                if !template.fields().iter().any(|f| f == field) {
                    return Err(WorkflowError::UnknownField(field.to_string()));
                }
                if !dataset.headers().iter().any(|h| h == column) {
                    return Err(WorkflowError::UnknownColumn(column.to_string()));
                }
                mapping.assign(field, column);
                Ok(())
            }
            _ => Err(expected),
        }
    }

    /// Step 3: leave one field unmapped
    pub fn clear(&mut self, field: &str) -> Result<(), WorkflowError> {
        let expected = self.wrong_step(Step::Mapping);
        match &mut self.state {
            State::Mapping { mapping, .. } => {
                mapping.clear(field);
                Ok(())
            }
            _ => Err(expected),
        }
    }

    /// Step 3: snapshot of everything generation needs
    pub fn generation_request(&self) -> Result<RunRequest, WorkflowError> {
        match &self.state {
            State::Mapping {
                template,
                dataset,
                mapping,
            } => Ok(RunRequest {
                template: template.clone(),
                dataset: dataset.clone(),
                mapping: mapping.clone(),
            }),
            _ => Err(self.wrong_step(Step::Mapping)),
        }
    }

    /// Step 3 to 4: record a finished run
    pub fn complete(&mut self, outcome: RunOutcome) -> Result<(), WorkflowError> {
        match std::mem::take(&mut self.state) {
            State::Mapping {
                template, dataset, ..
            } => {
                self.state = State::Review {
                    template,
                    dataset,
                    outcome,
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.wrong_step(Step::Mapping))
            }
        }
    }

    /// Step 4: summary of the finished run
    pub fn confirmation(&self) -> Result<Confirmation, WorkflowError> {
        match &self.state {
            State::Review {
                template,
                dataset,
                outcome,
            } => Ok(Confirmation {
                row_count: dataset.len(),
                template_name: template.name().to_string(),
                generated: outcome.generated,
                failed: outcome.failures.len(),
                analysis_complete: !outcome.summary.is_empty(),
            }),
            _ => Err(self.wrong_step(Step::Review)),
        }
    }

    pub fn template(&self) -> Option<&Template> {
        match &self.state {
            State::AwaitingTemplate => None,
            State::AwaitingDataset { template }
            | State::Mapping { template, .. }
            | State::Review { template, .. } => Some(template),
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        match &self.state {
            State::Mapping { dataset, .. } | State::Review { dataset, .. } => Some(dataset),
            _ => None,
        }
    }

    pub fn mapping(&self) -> Option<&FieldMapping> {
        match &self.state {
            State::Mapping { mapping, .. } => Some(mapping),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        match &self.state {
            State::Review { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    /// Drop everything and go back to step 1
    pub fn restart(&mut self) {
        self.state = State::AwaitingTemplate;
    }
}
