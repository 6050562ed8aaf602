//! Command dispatch: maps parsed arguments onto services.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, InferenceArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::serialization::node_to_str;
use crate::domain::{CorrectedCountsView, PrettyInference, TreeDisplay};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Execute the parsed command.
pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Reconstruct { inference, output }) => {
            cmd_reconstruct(inference, output.as_deref())
        }
        Some(Commands::Show { inference, json }) => cmd_show(inference, *json),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show { input } => cmd_config_show(input.as_deref()),
            ConfigCommands::Path => cmd_config_path(),
        },
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see `cntree --help`".to_string(),
        )),
    }
}

/// Layered settings with command-line flags applied last.
fn load_settings(args: &InferenceArgs) -> CliResult<Settings> {
    if !args.input.is_dir() {
        return Err(CliError::InvalidArgs(format!(
            "input is not a directory: {}",
            args.input.display()
        )));
    }
    let mut settings = Settings::load(Some(args.input.as_path()))?;
    if args.add_chr_ends {
        settings.add_chr_ends = true;
    }
    if args.no_add_chr_ends {
        settings.add_chr_ends = false;
    }
    if let Some(len) = args.end_bin_length {
        settings.end_bin_length = len;
    }
    if let Some(cn) = args.neutral_cn {
        if cn < 0 {
            return Err(CliError::InvalidArgs(format!(
                "neutral copy number must be non-negative, got {}",
                cn
            )));
        }
        settings.neutral_cn = cn;
    }
    debug!("effective settings: {:?}", settings);
    Ok(settings)
}

#[instrument(skip(args))]
fn cmd_reconstruct(args: &InferenceArgs, output: Option<&Path>) -> CliResult<()> {
    let settings = load_settings(args)?;
    let output_dir = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.output_dir.clone());
    let container = ServiceContainer::new(settings);

    let (matrix, dumped) = container
        .reconstruction
        .run(&args.counts, &args.input, &output_dir)?;

    output::success(&format!(
        "reconstructed {} loci x {} cells",
        matrix.locus_count(),
        matrix.cell_count()
    ));
    for path in [&dumped.attachment, &dumped.counts, &dumped.tree, &dumped.json] {
        output::action("Wrote", &path.display());
    }
    Ok(())
}

#[instrument(skip(args))]
fn cmd_show(args: &InferenceArgs, json: bool) -> CliResult<()> {
    let settings = load_settings(args)?;
    let container = ServiceContainer::new(settings);
    let service = &container.reconstruction;

    let counts = service.load_counts(&args.counts)?;
    let inference = service.load(&args.input, &counts)?;

    if json {
        let rendered = PrettyInference::new(&inference.tree, &inference.attachment, &counts)
            .to_json()
            .map_err(|e| ApplicationError::OperationFailed {
                context: "encode labelled tree".to_string(),
                source: Box::new(e),
            })?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", rendered).map_err(|e| InfraError::io("write stdout", e))?;
        return Ok(());
    }

    output::header(&format!(
        "Event tree: {} events, depth {}",
        inference.tree.len() - 1,
        inference.tree.depth()
    ));
    output::info(&inference.tree.to_labelled_tree(&counts));

    let mut cells_per_node: BTreeMap<_, usize> = BTreeMap::new();
    for node in &inference.attachment {
        *cells_per_node.entry(*node).or_default() += 1;
    }
    output::header(&format!(
        "Attachment: {} cells on {} nodes",
        counts.cell_count(),
        cells_per_node.len()
    ));
    for (node, cells) in cells_per_node {
        output::detail(&format!("{} {}", node_to_str(&node, &counts), cells));
    }
    Ok(())
}

fn cmd_config_show(input: Option<&Path>) -> CliResult<()> {
    let settings = Settings::load(input)?;
    output::info(&settings.to_toml()?);
    Ok(())
}

fn cmd_config_path() -> CliResult<()> {
    match global_config_path() {
        Some(path) => {
            let marker = if path.exists() { "" } else { " (not found)" };
            output::action("Global", &format!("{}{}", path.display(), marker));
        }
        None => output::warning("no global config directory on this platform"),
    }
    output::action(
        "Local",
        &format!("{}", local_config_path(Path::new("<input_dir>")).display()),
    );
    Ok(())
}
