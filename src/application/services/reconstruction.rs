//! Tree reconstruction service
//!
//! Loads an inferred tree and attachment, turns them into a copy-number
//! matrix and writes the results back to disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::config::Settings;
use crate::domain::serialization::{format_attachment, format_matrix, format_tree};
use crate::domain::{
    reconstruct, Attachment, CopyNumberMatrix, CorrectedCounts, CorrectedCountsView, EventTree,
    PrettyInference, TreeBuilder,
};
use crate::infrastructure::traits::FileSystem;

/// Tree and attachment as loaded from an inference directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResult {
    pub tree: EventTree,
    pub attachment: Attachment,
}

/// Paths written by [`ReconstructionService::dump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpedFiles {
    pub attachment: PathBuf,
    pub counts: PathBuf,
    pub tree: PathBuf,
    pub json: PathBuf,
}

/// Service for reconstructing copy numbers from inference output.
pub struct ReconstructionService {
    fs: Arc<dyn FileSystem>,
    settings: Arc<Settings>,
}

impl ReconstructionService {
    /// Create a new reconstruction service.
    pub fn new(fs: Arc<dyn FileSystem>, settings: Arc<Settings>) -> Self {
        Self { fs, settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn read(&self, path: &Path, action: &str) -> ApplicationResult<String> {
        if !self.fs.is_file(path) {
            return Err(ApplicationError::MissingInput(path.to_path_buf()));
        }
        self.fs.read_to_string(path).with_path_context(action, path)
    }

    /// Read the corrected counts CSV, adding chromosome ends when configured.
    #[instrument(level = "debug", skip(self))]
    pub fn load_counts(&self, path: &Path) -> ApplicationResult<CorrectedCounts> {
        let content = self.read(path, "read corrected counts")?;
        let mut counts = CorrectedCounts::parse(&content)?;
        if self.settings.add_chr_ends {
            counts.add_chromosome_ends(self.settings.neutral_cn as f64, self.settings.end_bin_length);
        }
        info!(
            "loaded {} loci x {} cells from {}",
            counts.locus_count(),
            counts.cell_count(),
            path.display()
        );
        Ok(counts)
    }

    /// Load tree and attachment from `input_dir`.
    #[instrument(level = "debug", skip(self, counts))]
    pub fn load(
        &self,
        input_dir: &Path,
        counts: &dyn CorrectedCountsView,
    ) -> ApplicationResult<InferenceResult> {
        let tree_path = input_dir.join(&self.settings.files.tree);
        let attachment_path = input_dir.join(&self.settings.files.attachment);

        let tree_content = self.read(&tree_path, "read tree")?;
        let tree = TreeBuilder::new().build_from_str(&tree_content, counts)?;

        let attachment_content = self.read(&attachment_path, "read attachment")?;
        let attachment = Attachment::parse(&attachment_content, counts)?;
        attachment.validate(&tree, counts.cell_count())?;

        debug!(
            "loaded tree with {} nodes (depth {}) and {} attached cells",
            tree.len(),
            tree.depth(),
            attachment.len()
        );
        Ok(InferenceResult { tree, attachment })
    }

    /// Reconstruct copy numbers with the configured neutral copy number.
    pub fn reconstruct(
        &self,
        inference: &InferenceResult,
        counts: &dyn CorrectedCountsView,
    ) -> ApplicationResult<CopyNumberMatrix> {
        Ok(reconstruct(
            &inference.tree,
            &inference.attachment,
            counts,
            self.settings.neutral_cn,
        )?)
    }

    /// Write attachment, matrix, tree and the JSON labelled variant to `output_dir`.
    #[instrument(level = "debug", skip(self, inference, matrix, counts))]
    pub fn dump(
        &self,
        output_dir: &Path,
        inference: &InferenceResult,
        matrix: &CopyNumberMatrix,
        counts: &dyn CorrectedCountsView,
    ) -> ApplicationResult<DumpedFiles> {
        if !self.fs.is_dir(output_dir) {
            self.fs
                .create_dir_all(output_dir)
                .with_path_context("create output directory", output_dir)?;
        }
        let files = &self.settings.files;
        let dumped = DumpedFiles {
            attachment: output_dir.join(&files.attachment),
            counts: output_dir.join(&files.counts),
            tree: output_dir.join(&files.tree),
            json: output_dir.join(&files.json),
        };

        self.write(
            &dumped.attachment,
            &format_attachment(&inference.attachment, counts),
            "write attachment",
        )?;
        self.write(&dumped.counts, &format_matrix(matrix), "write counts")?;
        self.write(
            &dumped.tree,
            &format_tree(&inference.tree, counts),
            "write tree",
        )?;
        let json = PrettyInference::new(&inference.tree, &inference.attachment, counts)
            .to_json()
            .map_err(|e| ApplicationError::OperationFailed {
                context: "encode labelled tree".to_string(),
                source: Box::new(e),
            })?;
        self.write(&dumped.json, &json, "write labelled tree")?;

        info!("dumped results to {}", output_dir.display());
        Ok(dumped)
    }

    fn write(&self, path: &Path, content: &str, action: &str) -> ApplicationResult<()> {
        debug!("{}: {}", action, path.display());
        self.fs.write(path, content).with_path_context(action, path)
    }

    /// Load, reconstruct and dump in one go.
    ///
    /// Reading from and writing to the same directory overwrites the input
    /// tree and attachment with their labelled form.
    #[instrument(level = "info", skip(self))]
    pub fn run(
        &self,
        counts_path: &Path,
        input_dir: &Path,
        output_dir: &Path,
    ) -> ApplicationResult<(CopyNumberMatrix, DumpedFiles)> {
        let counts = self.load_counts(counts_path)?;
        let inference = self.load(input_dir, &counts)?;
        let matrix = self.reconstruct(&inference, &counts)?;
        let dumped = self.dump(output_dir, &inference, &matrix, &counts)?;
        Ok((matrix, dumped))
    }
}
