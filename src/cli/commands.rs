//! Command dispatch

use std::collections::BTreeSet;
use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{ExploreService, LoadedTree};
use crate::cli::args::{Cli, Commands, ConfigCommands, EnumerateArgs, TreeArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::MuType;
use crate::infrastructure::di::ServiceContainer;
use crate::tree_traits::TreeNodeConvert;

pub fn execute(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage("no command given, see --help".into()));
    };

    match command {
        Commands::Tree { tree, graph } => cmd_tree(tree, *graph),
        Commands::Samples { tree, mtype } => cmd_samples(tree, mtype.as_deref()),
        Commands::Status { tree, mtype } => cmd_status(tree, mtype.as_deref()),
        Commands::Overlap { tree, first, second } => cmd_overlap(tree, first, second),
        Commands::Subtypes { tree, enumerate } => cmd_subtypes(tree, enumerate),
        Commands::Combos { tree, enumerate, sizes } => cmd_combos(tree, enumerate, sizes.as_deref()),
        Commands::Treetypes { tree, enumerate } => cmd_treetypes(tree, enumerate),
        Commands::Config { command } => cmd_config(command),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}

/// Service configured for the directory of `records`.
fn service_for(records: &Path) -> CliResult<ExploreService> {
    let settings = Settings::load(records.parent())?;
    debug!(?settings, "effective settings");
    Ok(ServiceContainer::new(settings).explore_service())
}

fn load(args: &TreeArgs) -> CliResult<(ExploreService, LoadedTree)> {
    let service = service_for(&args.records)?;
    let loaded = service.build(&args.records, args.levels.as_deref())?;
    Ok((service, loaded))
}

fn parse_type(service: &ExploreService, json: Option<&str>) -> CliResult<Option<MuType>> {
    json.map(|j| service.parse_type(j)).transpose().map_err(CliError::from)
}

fn print_types(types: &BTreeSet<MuType>) {
    for mtype in types {
        output::info(mtype);
    }
    debug!(count = types.len(), "printed types");
}

#[instrument(level = "debug")]
fn cmd_tree(args: &TreeArgs, graph: bool) -> CliResult<()> {
    let (_, loaded) = load(args)?;
    let unused = loaded.unused_levels();
    if !unused.is_empty() {
        output::warning(&format!("levels without values: {}", unused.join(", ")));
    }
    if graph {
        output::info(&loaded.tree.to_tree_string());
    } else {
        print!("{}", loaded.tree);
    }
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_samples(args: &TreeArgs, mtype: Option<&str>) -> CliResult<()> {
    let (service, loaded) = load(args)?;
    let mtype = parse_type(&service, mtype)?;
    for sample in service.samples(&loaded, mtype.as_ref())? {
        output::info(&sample);
    }
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_status(args: &TreeArgs, mtype: Option<&str>) -> CliResult<()> {
    let (service, loaded) = load(args)?;
    let mtype = parse_type(&service, mtype)?;
    if let Some(mtype) = &mtype {
        output::header(mtype);
    }
    for (sample, mutated) in service.status(&loaded, mtype.as_ref())? {
        output::status(&sample, mutated);
    }
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_overlap(args: &TreeArgs, first: &str, second: &str) -> CliResult<()> {
    let (service, loaded) = load(args)?;
    let first = service.parse_type(first)?;
    let second = service.parse_type(second)?;
    let overlap = service.overlap(&loaded, &first, &second)?;
    output::info(&format!("{overlap:.4}"));
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_subtypes(args: &TreeArgs, opts: &EnumerateArgs) -> CliResult<()> {
    let (service, loaded) = load(args)?;
    let mtype = parse_type(&service, opts.mtype.as_deref())?;
    let types = service.subtypes(&loaded, mtype.as_ref(), opts.sub_levels.as_deref(), opts.min_size)?;
    print_types(&types);
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_combos(args: &TreeArgs, opts: &EnumerateArgs, sizes: Option<&[usize]>) -> CliResult<()> {
    if sizes.is_some_and(|s| s.iter().all(|&k| k == 0)) {
        return Err(CliError::InvalidArgs("subset sizes must include a positive size".into()));
    }
    let (service, loaded) = load(args)?;
    let mtype = parse_type(&service, opts.mtype.as_deref())?;
    let types = service.combinations(
        &loaded,
        mtype.as_ref(),
        opts.sub_levels.as_deref(),
        opts.min_size,
        sizes,
    )?;
    print_types(&types);
    Ok(())
}

#[instrument(level = "debug")]
fn cmd_treetypes(args: &TreeArgs, opts: &EnumerateArgs) -> CliResult<()> {
    let (service, loaded) = load(args)?;
    let mtype = parse_type(&service, opts.mtype.as_deref())?;
    let types = service.all_combinations(&loaded, mtype.as_ref(), opts.sub_levels.as_deref(), opts.min_size)?;
    print_types(&types);
    Ok(())
}

fn cmd_config(command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show { dir } => {
            let settings = Settings::load(dir.as_deref())?;
            print!("{}", settings.to_toml()?);
        }
        ConfigCommands::Template => print!("{}", Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no config directory on this platform"),
            }
            output::action("local", &local_config_path(Path::new("<records dir>")).display());
        }
    }
    Ok(())
}
