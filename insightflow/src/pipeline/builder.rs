//! Pipeline builder with order validation.

use std::fmt;
use std::sync::Arc;

use crate::errors::ConfigurationError;
use crate::stages::{standard_stages, Stage, StageId};

/// A validated, ordered list of stages.
#[derive(Clone)]
pub struct Pipeline {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_ids())
            .finish()
    }
}

impl Pipeline {
    /// The six built-in analysis stages.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            name: "insight".to_string(),
            stages: standard_stages(),
        }
    }

    /// Pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage ids in execution order.
    #[must_use]
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    /// The stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// True if the pipeline has no stages. A built pipeline never is.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Builder for [`Pipeline`].
///
/// Stages must be added in strictly increasing [`StageId`] order, so a stage
/// can only depend on stages that already ran.
#[derive(Clone)]
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Arc<dyn Stage>>,
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("name", &self.name)
            .field("stages", &self.stages.iter().map(|s| s.id()).collect::<Vec<_>>())
            .finish()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Appends a stage.
    ///
    /// # Errors
    ///
    /// Returns `CONFIG-006-STAGE-ORDER` if the stage does not come strictly
    /// after the last one added.
    pub fn stage(mut self, stage: Arc<dyn Stage>) -> Result<Self, ConfigurationError> {
        if let Some(last) = self.stages.last() {
            if stage.id() <= last.id() {
                return Err(ConfigurationError::stage_order(last.id(), stage.id()));
            }
        }
        self.stages.push(stage);
        Ok(self)
    }

    /// Appends several stages in order.
    pub fn stages<I>(self, stages: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = Arc<dyn Stage>>,
    {
        stages.into_iter().try_fold(self, Self::stage)
    }

    /// Finishes the pipeline.
    ///
    /// # Errors
    ///
    /// Returns `CONFIG-005-EMPTY-PIPELINE` if no stage was added.
    pub fn build(self) -> Result<Pipeline, ConfigurationError> {
        if self.stages.is_empty() {
            return Err(ConfigurationError::empty_pipeline(&self.name));
        }
        Ok(Pipeline {
            name: self.name,
            stages: self.stages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StageContext;
    use crate::core::Fragment;
    use crate::errors::codes;
    use crate::stages::{FnStage, StageResult};

    fn noop(id: StageId) -> Arc<dyn Stage> {
        Arc::new(FnStage::new(id, |_: &StageContext<'_>| StageResult::success(Fragment::new())))
    }

    #[test]
    fn test_build_in_order() {
        let pipeline = PipelineBuilder::new("p")
            .stage(noop(StageId::Interpret))
            .and_then(|b| b.stage(noop(StageId::Statistics)))
            .and_then(PipelineBuilder::build)
            .unwrap();

        assert_eq!(pipeline.name(), "p");
        assert_eq!(pipeline.stage_ids(), vec![StageId::Interpret, StageId::Statistics]);
        assert_eq!(pipeline.len(), 2);
    }

    #[test]
    fn test_rejects_out_of_order_stage() {
        let err = PipelineBuilder::new("p")
            .stage(noop(StageId::Report))
            .and_then(|b| b.stage(noop(StageId::Quality)))
            .unwrap_err();
        assert_eq!(err.code(), codes::STAGE_ORDER);
    }

    #[test]
    fn test_rejects_duplicate_stage() {
        let err = PipelineBuilder::new("p")
            .stages(vec![noop(StageId::Quality), noop(StageId::Quality)])
            .unwrap_err();
        assert_eq!(err.code(), codes::STAGE_ORDER);
    }

    #[test]
    fn test_empty_pipeline_rejected() {
        let err = PipelineBuilder::new("empty").build().unwrap_err();
        assert_eq!(err.code(), codes::EMPTY_PIPELINE);
    }

    #[test]
    fn test_standard_pipeline() {
        let pipeline = Pipeline::standard();
        assert_eq!(pipeline.stage_ids(), StageId::ALL.to_vec());
        assert!(format!("{pipeline:?}").contains("Interpret"));
    }
}
