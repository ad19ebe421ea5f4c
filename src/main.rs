use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use log::{error, info, LevelFilter};
use quire::build::build_site;
use quire::config::Config;
use simplelog::{ColorChoice, TermLogger, TerminalMode};
use std::path::{Path, PathBuf};

fn main() {
    let matches = App::new("quire")
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .global(true)
                .help("Log every file read and page written"),
        )
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site into the output directory")
                .arg(
                    Arg::with_name("project")
                        .short("p")
                        .long("project")
                        .takes_value(true)
                        .default_value(".")
                        .help("The directory to search (upwards) for quire.yaml"),
                )
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .help("Overrides the configured output directory"),
                ),
        )
        .get_matches();

    let level = match matches.is_present("verbose") {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    if let Err(e) = TermLogger::init(
        level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("Failed initializing logger: {}", e);
    }

    let result = match matches.subcommand() {
        ("build", Some(matches)) => build(matches),
        _ => unreachable!("clap requires a subcommand"),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn build(matches: &ArgMatches) -> Result<()> {
    let project = Path::new(matches.value_of("project").unwrap_or("."));
    let mut config = Config::from_directory(project)?;
    if let Some(output) = matches.value_of("output") {
        config.output_directory = PathBuf::from(output);
    }

    let summary = build_site(&config).context("Building site")?;
    info!(
        "built {} posts and {} tags into `{}`",
        summary.posts,
        summary.tags,
        config.output_directory.display()
    );
    Ok(())
}
