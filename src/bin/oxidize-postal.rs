use std::path::PathBuf;
use std::process::ExitCode;

use oxidize_postal::{DataConfig, DataManager, DownloadOutcome, Postal, PostalConfig};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Parse { address: String, json: bool },
    Expand { address: String, json: bool },
    Normalize { address: String },
    DataDownload { force: bool },
    DataCheck,
    DataRemove,
    Help,
    Version,
}

#[derive(Debug)]
struct Cli {
    command: Command,
    dictionary: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    max_combinations: Option<usize>,
}

impl Cli {
    fn data_config(&self) -> DataConfig {
        let mut config = DataConfig::default();
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        config
    }

    fn postal(&self) -> oxidize_postal::Result<Postal> {
        let mut builder = PostalConfig::builder().data_config(self.data_config());
        if let Some(path) = &self.dictionary {
            builder = builder.dictionary_path(path);
        }
        if let Some(max) = self.max_combinations {
            builder = builder.max_combinations(max);
        }
        Postal::with_config(builder.build())
    }
}

fn run(cli: Cli) -> oxidize_postal::Result<ExitCode> {
    match &cli.command {
        Command::Help => println!("{}", help_text()),
        Command::Version => println!("oxidize-postal {}", env!("CARGO_PKG_VERSION")),
        Command::Parse { address, json } => {
            let postal = cli.postal()?;
            if *json {
                println!("{}", postal.parse_address_to_json(address)?);
            } else {
                for (label, value) in postal.parse_address(address)?.iter() {
                    println!("{label}: {value}");
                }
            }
        }
        Command::Expand { address, json } => {
            let postal = cli.postal()?;
            if *json {
                println!("{}", postal.expand_address_to_json(address)?);
            } else {
                for expansion in postal.expand_address(address)? {
                    println!("{expansion}");
                }
            }
        }
        Command::Normalize { address } => {
            println!("{}", cli.postal()?.normalize_address(address)?);
        }
        Command::DataDownload { force } => {
            let manager = DataManager::with_config(cli.data_config());
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;

            match runtime.block_on(manager.download(*force))? {
                DownloadOutcome::Downloaded => {
                    println!("Data downloaded to {}", manager.data_dir().display())
                }
                DownloadOutcome::AlreadyPresent => {
                    println!("Data already present at {}", manager.data_dir().display())
                }
            }
        }
        Command::DataCheck => {
            let manager = DataManager::with_config(cli.data_config());
            let missing = manager.missing_files();
            if !missing.is_empty() {
                println!("Data missing at {}", manager.data_dir().display());
                for file in missing {
                    println!("  missing: {file}");
                }
                return Ok(ExitCode::FAILURE);
            }

            manager.verify_data()?;
            println!("Data available at {}", manager.data_dir().display());
        }
        Command::DataRemove => {
            let manager = DataManager::with_config(cli.data_config());
            if manager.cleanup()? {
                println!("Removed {}", manager.data_dir().display());
            } else {
                println!("No data found at {}", manager.data_dir().display());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Cli, String> {
    let mut positionals = Vec::new();
    let mut json = false;
    let mut force = false;
    let mut dictionary = None;
    let mut data_dir = None;
    let mut max_combinations = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(bare(Command::Help)),
            "-V" | "--version" => return Ok(bare(Command::Version)),
            "--json" => json = true,
            "--force" => force = true,
            "--dictionary" => {
                let value = args.next().ok_or_else(|| "error: --dictionary expects a value".to_string())?;
                dictionary = Some(PathBuf::from(value));
            }
            "--data-dir" => {
                let value = args.next().ok_or_else(|| "error: --data-dir expects a value".to_string())?;
                data_dir = Some(PathBuf::from(value));
            }
            "--max-combinations" => {
                let value = args
                    .next()
                    .ok_or_else(|| "error: --max-combinations expects a value".to_string())?;
                max_combinations = Some(parse_count(&value)?);
            }
            "--" => {
                positionals.extend(args.by_ref());
                break;
            }
            _ if arg.starts_with("--dictionary=") => {
                dictionary = Some(PathBuf::from(arg.trim_start_matches("--dictionary=")));
            }
            _ if arg.starts_with("--data-dir=") => {
                data_dir = Some(PathBuf::from(arg.trim_start_matches("--data-dir=")));
            }
            _ if arg.starts_with("--max-combinations=") => {
                max_combinations = Some(parse_count(arg.trim_start_matches("--max-combinations="))?);
            }
            _ if arg.starts_with('-') && arg.len() > 1 => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => positionals.push(arg),
        }
    }

    let mut positionals = positionals.into_iter();
    let Some(name) = positionals.next() else {
        return Err(format!("error: no command provided\n\n{}", help_text()));
    };
    let rest: Vec<String> = positionals.collect();

    let address = || -> Result<String, String> {
        let address = rest.join(" ");
        if address.trim().is_empty() {
            return Err(format!("error: '{name}' expects an address"));
        }
        Ok(address)
    };

    let command = match name.as_str() {
        "parse" => Command::Parse { address: address()?, json },
        "expand" => Command::Expand { address: address()?, json },
        "normalize" => Command::Normalize { address: address()? },
        "data" => match rest.as_slice() {
            [action] if action == "download" => Command::DataDownload { force },
            [action] if action == "check" => Command::DataCheck,
            [action] if action == "remove" => Command::DataRemove,
            _ => return Err("error: 'data' expects one of: download, check, remove".to_string()),
        },
        other => return Err(format!("error: unknown command '{other}'")),
    };

    Ok(Cli {
        command,
        dictionary,
        data_dir,
        max_combinations,
    })
}

fn bare(command: Command) -> Cli {
    Cli {
        command,
        dictionary: None,
        data_dir: None,
        max_combinations: None,
    }
}

fn parse_count(value: &str) -> Result<usize, String> {
    value
        .parse::<usize>()
        .ok()
        .filter(|count| *count > 0)
        .ok_or_else(|| format!("error: invalid --max-combinations '{value}' (expected a positive integer)"))
}

fn help_text() -> String {
    format!(
        "oxidize-postal {version}

Address parsing, expansion and normalization.

Usage:
  oxidize-postal [OPTIONS] parse <address...> [--json]
  oxidize-postal [OPTIONS] expand <address...> [--json]
  oxidize-postal [OPTIONS] normalize <address...>
  oxidize-postal [OPTIONS] data download [--force]
  oxidize-postal [OPTIONS] data check
  oxidize-postal [OPTIONS] data remove

Options:
  --json                     Print parse or expand results as JSON.
  --force                    Download data even if it is already present.
  --dictionary <path>        Load the expansion dictionary from a file.
  --data-dir <path>          Data directory. Default: ${env}, a system
                             libpostal directory, or the user data directory.
  --max-combinations <n>     Cap on expansions per address. Default: {max}
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Exit codes:
  0  Success.
  1  Operation failed or data missing.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        env = oxidize_postal::data::DATA_DIR_ENV,
        max = oxidize_postal::DEFAULT_MAX_COMBINATIONS,
    )
}
