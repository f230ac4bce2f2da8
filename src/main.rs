use anyhow::Context;
use appcfg::bind9::{self, Filter};
use appcfg::config::{AppConfig, DEFAULT_CONFIG_PATH};
use appcfg::kea::{self, DefinitionStore, KeaConfig, Universe};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "appcfg",
    version,
    about = "Inspect and normalize BIND 9 and Kea DHCP configurations"
)]
struct Cli {
    /// TOML settings file; defaults apply when it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Print a named.conf file in canonical form
    #[command(name = "bind9-format")]
    Bind9Format {
        file: PathBuf,

        /// Replace include statements with the included statements
        #[arg(long)]
        expand: bool,

        /// Directory relative includes are resolved against (default: the file's directory)
        #[arg(long)]
        base_dir: Option<PathBuf>,

        /// Comma separated filter tags: config, view, zone, no-parse
        #[arg(long)]
        filter: Option<String>,

        /// Indentation pattern
        #[arg(long)]
        indent: Option<String>,
    },

    /// Print the TSIG key a view's match-clients resolves to
    #[command(name = "bind9-view-key")]
    Bind9ViewKey {
        file: PathBuf,

        #[arg(long)]
        view: String,
    },

    /// Print the rndc and statistics-channel endpoints
    #[command(name = "bind9-controls")]
    Bind9Controls { file: PathBuf },

    /// Decode the global option-data of a Kea configuration into typed fields
    #[command(name = "kea-options")]
    KeaOptions {
        file: PathBuf,

        /// v4 or v6 (default: derived from the configuration, then settings)
        #[arg(long)]
        universe: Option<Universe>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)
        .with_context(|| format!("cannot read settings: {}", cli.config.display()))?;

    match cli.cmd {
        Cmd::Bind9Format {
            file,
            expand,
            base_dir,
            filter,
            indent,
        } => {
            let mut config = parse_bind9(&file)?;
            if expand {
                let base_dir = base_dir.unwrap_or_else(|| parent_dir(&file));
                config = config
                    .expand(&base_dir)
                    .with_context(|| format!("cannot expand includes of {}", file.display()))?;
            }
            let filter = match filter {
                Some(list) => Some(Filter::parse_list(&list)?),
                None => cfg.bind9.filter()?,
            };
            let indent = indent.unwrap_or(cfg.bind9.indent);
            println!("{}", config.format(&indent, filter.as_ref()));
        }
        Cmd::Bind9ViewKey { file, view } => {
            let config = parse_bind9(&file)?;
            match config.get_view_key(&view)? {
                Some(key) => {
                    let (algorithm, _) = key.get_algorithm_secret()?;
                    println!("view {view}: key {} ({algorithm})", key.name);
                }
                None => println!("view {view}: no key"),
            }
        }
        Cmd::Bind9Controls { file } => {
            let config = parse_bind9(&file)?;
            match config.get_rndc_connection_params() {
                Some(params) => {
                    let key = params.key.map_or("none", |k| k.name.as_str());
                    println!("rndc: {}:{} key {key}", params.address, params.port);
                }
                None => println!("rndc: not configured"),
            }
            match config.get_statistics_channel_address() {
                Some((address, port)) => println!("statistics: {address}:{port}"),
                None => println!("statistics: not configured"),
            }
        }
        Cmd::KeaOptions { file, universe } => {
            let kea_config = KeaConfig::load(&file)
                .with_context(|| format!("cannot read Kea configuration: {}", file.display()))?;
            let universe = universe
                .or_else(|| kea_config.universe())
                .unwrap_or(cfg.kea.universe);

            let mut store = match &cfg.kea.option_defs_dir {
                Some(dir) => DefinitionStore::load_dir(Path::new(dir))
                    .with_context(|| format!("cannot load option definitions from {dir}"))?,
                None => DefinitionStore::new(),
            };
            store.add_shared_definitions(kea_config.get_option_definitions()?);

            let mut options = Vec::new();
            for data in kea_config.get_global_option_data()? {
                let option = kea::create_dhcp_option(&data, universe, &store)
                    .with_context(|| format!("cannot decode option {} ({})", data.code, data.name))?;
                options.push(option);
            }
            tracing::info!(count = options.len(), %universe, "decoded option data");
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
    }
    Ok(())
}

fn parse_bind9(file: &Path) -> anyhow::Result<bind9::Config> {
    bind9::parse_file(file).with_context(|| format!("cannot parse {}", file.display()))
}

fn parent_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
