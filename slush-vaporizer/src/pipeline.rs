//! Pipeline runner
//!
//! Sequences optional loop extraction and the effect chain for one input,
//! threading each step's output into the next. All intermediate files live
//! next to the final output and are removed when the run ends, whatever the
//! outcome.

use crate::analysis::FeatureAnalyzer;
use crate::effects::EffectExecutor;
use crate::error::Result;
use crate::loops::extract_loop;
use crate::options::{PresetCatalog, ProcessingOptions};
use crate::planner::plan;
use crate::style;
use crate::types::BestEffort;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Intermediate files owned by one run, deleted on drop
#[derive(Debug, Default)]
pub struct TempFiles {
    paths: Vec<PathBuf>,
}

impl TempFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of an existing file
    pub fn track(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Reserve a fresh `temp_{uuid}.wav` path in `dir`
    pub fn allocate(&mut self, dir: &Path) -> PathBuf {
        let path = dir.join(format!("temp_{}.wav", Uuid::new_v4()));
        self.paths.push(path.clone());
        path
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Stop tracking every file and hand the paths back
    pub fn release(mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.paths)
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed temporary file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to remove temporary file"
                    )
                }
            }
        }
    }
}

/// Applies resolved options to one file
#[derive(Clone)]
pub struct PipelineRunner {
    executor: Arc<dyn EffectExecutor>,
}

impl PipelineRunner {
    pub fn new(executor: Arc<dyn EffectExecutor>) -> Self {
        Self { executor }
    }

    /// Run loop extraction (if enabled) and the planned chain
    ///
    /// The last effect writes `output` directly; an empty chain copies the
    /// working input to `output` unchanged.
    pub fn run(&self, input: &Path, output: &Path, options: &ProcessingOptions) -> Result<PathBuf> {
        let work_dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temps = TempFiles::new();
        let mut current = input.to_path_buf();

        if let Some(loop_cfg) = options.active_loop_detection() {
            if let BestEffort::Applied(loop_path) =
                extract_loop(&current, work_dir, loop_cfg.duration_seconds)
            {
                temps.track(loop_path.clone());
                current = loop_path;
            }
        }

        let chain = plan(options);
        tracing::info!(
            input = %input.display(),
            output = %output.display(),
            effects = ?chain.iter().map(|e| e.name()).collect::<Vec<_>>(),
            "Running effect chain"
        );

        if chain.is_empty() {
            std::fs::copy(&current, output)?;
            return Ok(output.to_path_buf());
        }

        let last = chain.len() - 1;
        for (i, effect) in chain.iter().enumerate() {
            let step_output = if i == last {
                output.to_path_buf()
            } else {
                temps.allocate(work_dir)
            };
            self.executor.apply(effect, &current, &step_output)?;
            current = step_output;
        }

        Ok(output.to_path_buf())
    }
}

/// Full transform: style analysis, option merge, pipeline run
#[derive(Clone)]
pub struct Vaporizer {
    runner: PipelineRunner,
    analyzer: FeatureAnalyzer,
    presets: Arc<PresetCatalog>,
}

impl Vaporizer {
    pub fn new(
        runner: PipelineRunner,
        analyzer: FeatureAnalyzer,
        presets: Arc<PresetCatalog>,
    ) -> Self {
        Self {
            runner,
            analyzer,
            presets,
        }
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    /// Transform `input` into `output`
    ///
    /// With a reference, both files are fingerprinted and the derived options
    /// sit between the preset and the explicit options. Analysis failure only
    /// drops the derived layer.
    pub fn process(
        &self,
        input: &Path,
        output: &Path,
        explicit: &ProcessingOptions,
        reference: Option<&Path>,
    ) -> Result<PathBuf> {
        let derived = match reference {
            Some(reference) => self.style_options(input, reference).unwrap_or_default(),
            None => ProcessingOptions::default(),
        };
        let preset = self.presets.options_for(explicit.preset.as_deref());
        let merged = ProcessingOptions::merge(&preset, &derived, explicit);

        self.runner.run(input, output, &merged)
    }

    /// Style-transfer options for `input` against `reference`
    pub fn style_options(&self, input: &Path, reference: &Path) -> BestEffort<ProcessingOptions> {
        let fingerprints = self
            .analyzer
            .analyze(input)
            .and_then(|target| Ok((target, self.analyzer.analyze(reference)?)));

        match fingerprints {
            Ok((target, reference)) => BestEffort::Applied(style::resolve(&target, &reference)),
            Err(e) => {
                tracing::warn!(
                    input = %input.display(),
                    reference = %reference.display(),
                    error = %e,
                    "Style transfer analysis failed, continuing without it"
                );
                BestEffort::degraded(e.to_string())
            }
        }
    }
}
