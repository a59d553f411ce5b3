use anyhow::{Context, Result, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use log::{Level, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use trophy::{ExportFilter, ParserSettings, TrophyPackage, TrophyParser, export_files};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum TrophyOutputFormat {
    Json,
    JsonLines,
    Text,
}

struct TrophyDump {
    parser_settings: ParserSettings,
    input: PathBuf,
    output_format: TrophyOutputFormat,
    output_target: Option<PathBuf>,
    confirm_overwrite: bool,
    extract_dir: Option<PathBuf>,
    extract_filter: Option<String>,
    verbosity_level: Option<Level>,
}

impl TrophyDump {
    fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .context("missing INPUT argument")?,
        );

        let output_format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
            .unwrap_or("json")
        {
            "jsonl" => TrophyOutputFormat::JsonLines,
            "text" => TrophyOutputFormat::Text,
            _ => TrophyOutputFormat::Json,
        };

        let extract_filter = match (
            matches.get_flag("images-only"),
            matches.get_one::<String>("filter"),
        ) {
            (true, Some(_)) => bail!("`--images-only` and `--filter` cannot be used together"),
            (true, None) => Some(".PNG".to_string()),
            (false, filter) => filter.cloned(),
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(Level::Info),
            2 => Some(Level::Debug),
            3 => Some(Level::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(Level::Trace)
            }
        };

        Ok(TrophyDump {
            parser_settings: ParserSettings::new()
                .trim_text(matches.get_flag("trim"))
                .skip_checksum_region(!matches.get_flag("v2-table-at-header-end")),
            input,
            output_format,
            output_target: matches.get_one::<String>("output-target").map(PathBuf::from),
            confirm_overwrite: !matches.get_flag("no-confirm-overwrite"),
            extract_dir: matches.get_one::<String>("extract").map(PathBuf::from),
            extract_filter,
            verbosity_level,
        })
    }

    /// Main entry point for `TrophyDump`
    fn run(&self) -> Result<()> {
        self.try_to_initialize_logging();

        let parser = TrophyParser::from_path(&self.input)?
            .with_configuration(self.parser_settings.clone());
        let package = parser
            .parse()
            .with_context(|| format!("failed to parse {}", self.input.display()))?;

        let mut output: Box<dyn Write> = match &self.output_target {
            Some(path) => Box::new(create_output_file(path, self.confirm_overwrite)?),
            None => Box::new(io::stdout().lock()),
        };
        self.dump_package(&package, &mut output)?;
        output.flush()?;

        if let Some(dir) = &self.extract_dir {
            let filter = match &self.extract_filter {
                Some(needle) => ExportFilter::NameContains(needle),
                None => ExportFilter::All,
            };
            let written = export_files(package.files(), dir, filter)?;
            info!("Extracted {} files to {}", written.len(), dir.display());
        }

        Ok(())
    }

    fn dump_package(&self, package: &TrophyPackage, out: &mut dyn Write) -> Result<()> {
        match self.output_format {
            TrophyOutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, package.trophy_set())?;
                writeln!(out)?;
            }
            TrophyOutputFormat::JsonLines => {
                for trophy in package.trophies() {
                    serde_json::to_writer(&mut *out, trophy)?;
                    writeln!(out)?;
                }
            }
            TrophyOutputFormat::Text => {
                let header = package.header();
                writeln!(out, "{} {}", package.trophy_set(), package.title())?;
                writeln!(out, "  {}", package.detail())?;
                writeln!(
                    out,
                    "  set version {}, container {:?}, {} files",
                    package.version(),
                    header.version,
                    package.files().len()
                )?;
                for trophy in package.trophies() {
                    writeln!(
                        out,
                        "{:>4} {:<8} {:<6} {} - {}{}",
                        trophy.id(),
                        trophy.trophy_type().to_string(),
                        if trophy.hidden() { "hidden" } else { "" },
                        trophy.name(),
                        trophy.description(),
                        if trophy.icon().is_some() { "" } else { " (no icon)" }
                    )?;
                }
            }
        }
        Ok(())
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                level.to_level_filter(),
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {}", e);
            }
        }
    }
}

/// If `prompt` is passed, will display a confirmation prompt before overwriting files.
fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
    let p = path.as_ref();

    if p.is_dir() {
        bail!(
            "There is a directory at {}, refusing to overwrite",
            p.display()
        );
    }

    if p.exists() && prompt {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to override output file at {}",
                p.display()
            ))
            .default(false)
            .interact()
            .context("Failed to write confirmation prompt to term")?;

        if !confirmed {
            bail!("Cancelled");
        }
    }

    if let Some(parent) = p.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    File::create(p).with_context(|| format!("failed to create {}", p.display()))
}

fn command() -> Command {
    Command::new("trophy_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to parse TRP trophy packages")
        .arg(Arg::new("INPUT").required(true))
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("format")
                .value_parser(["json", "jsonl", "text"])
                .default_value("json")
                .help("Sets the output format")
                .long_help(indoc!(r#"
                    Sets the output format:
                        "json"  - the whole trophy set as an indented JSON document.
                        "jsonl" - one JSON object per trophy, one per line.
                        "text"  - a human readable listing.
                "#)),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .value_name("FILE")
                .help("Writes output to the file specified instead of stdout, errors will still be printed to stderr. \
                       Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`. \
                       Will create parent directories if needed."),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("extract")
                .long("extract")
                .short('x')
                .value_name("DIR")
                .help("Also write the files stored in the package to DIR, under their original names."),
        )
        .arg(
            Arg::new("images-only")
                .long("images-only")
                .action(ArgAction::SetTrue)
                .help("With `--extract`, only write `.PNG` entries."),
        )
        .arg(
            Arg::new("filter")
                .long("filter")
                .value_name("SUBSTRING")
                .help("With `--extract`, only write entries whose name contains SUBSTRING."),
        )
        .arg(
            Arg::new("trim")
                .long("trim")
                .action(ArgAction::SetTrue)
                .help("Strip whitespace around text values of the configuration document."),
        )
        .arg(
            Arg::new("v2-table-at-header-end")
                .long("v2-table-at-header-end")
                .action(ArgAction::SetTrue)
                .help("Read the file table of version 2 packages at offset 64 instead of 84."),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("-v - info, -vv - debug, -vvv - trace. \
                       trace output is only available in debug builds, as it is extremely verbose"),
        )
}

fn main() {
    let matches = command().get_matches();

    let result = TrophyDump::from_cli_matches(&matches).and_then(|app| app.run());
    if let Err(e) = result {
        eprintln!("{:?}", e);
        exit(1);
    }
}
