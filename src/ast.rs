use std::path::PathBuf;

/// Where a stage's standard output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    NextStageInput,
    File(PathBuf),
    Inherited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
    pub tokens: Vec<String>,
    pub output: OutputTarget,
}

impl PipelineStage {
    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }
}

/// Stages in spawn order; only the last one carries redirection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pipeline {
    pub stages: Vec<PipelineStage>,
    pub background: bool,
}

impl Pipeline {
    pub fn is_empty(&self) -> bool {
        self.stages
            .first()
            .map_or(true, |stage| stage.tokens.is_empty())
    }

    pub fn terminal(&self) -> Option<&PipelineStage> {
        self.stages.last()
    }

    /// Command text shown by `jobs`, rebuilt from the parsed stages.
    pub fn command_text(&self) -> String {
        let mut text = self
            .stages
            .iter()
            .map(|stage| stage.tokens.join(" "))
            .collect::<Vec<_>>()
            .join(" | ");
        if let Some(OutputTarget::File(path)) = self.terminal().map(|s| &s.output) {
            text.push_str(" > ");
            text.push_str(&path.to_string_lossy());
        }
        if self.background {
            text.push_str(" &");
        }
        text
    }
}
