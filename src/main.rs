use anyhow::{bail, Context, Result};
use blogpress::build::build_site;
use blogpress::config::Config;
use clap::{command, Arg};
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = command!()
        .args(&[
            Arg::new("project_dir")
                .help("Directory containing blog.yaml (or one of its subdirectories)")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("."),
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Output directory. Overrides the project file's layout.output.")
                .value_parser(clap::value_parser!(PathBuf)),
        ])
        .get_matches();

    let project_dir = matches
        .get_one::<PathBuf>("project_dir")
        .context("missing project directory")?;
    if !project_dir.is_dir() {
        bail!("`{}` is not a directory.", project_dir.display());
    }
    let project_dir = project_dir
        .canonicalize()
        .with_context(|| format!("resolving `{}`", project_dir.display()))?;

    let mut config = Config::from_directory(&project_dir)?;
    if let Some(output) = matches.get_one::<PathBuf>("output") {
        if output.exists() && !output.is_dir() {
            bail!("if the output exists, it must be a directory.");
        }
        config.output_directory = output.clone();
    }

    build_site(&config).context("building site")?;
    Ok(())
}
