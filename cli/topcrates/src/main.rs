//! topcrates: build an offline crates.io mirror of the most used crates.

mod commands;
mod logging;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};

use topcrates_mirror::{Config, Filters, CONFIG_FILE};

#[derive(Parser)]
#[command(
    name = "topcrates",
    version,
    about = "Build an offline mirror of the top crates and their dependencies"
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// crates.io-index checkout (overrides the configuration)
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    /// Only use this configured category (repeatable)
    #[arg(long = "category", global = true)]
    categories: Vec<String>,
    /// Only follow platform-specific edges for this target triple (repeatable)
    #[arg(long = "target", global = true)]
    targets: Vec<String>,
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Clone or update the crates.io index
    Update,
    /// Select, resolve and write the mirror
    Prepare {
        /// Mirror directory (default: from the configuration)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory of source .crate archives
        #[arg(long)]
        cache: Option<PathBuf>,
        /// Write versions lacking an archive to this JSON file
        #[arg(long)]
        missing: Option<PathBuf>,
    },
    /// Show what would be mirrored without writing anything
    Report {
        /// Print dependency trees instead of a flat list
        #[arg(long)]
        tree: bool,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the archives of a mirror against the index checksums
    Verify {
        /// Mirror directory (default: from the configuration)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    logging::init(cli.verbose)?;
    let cwd = std::env::current_dir()?;

    let filters = Filters {
        categories: cli.categories,
        targets: cli.targets,
    };
    let load = || load_config(&cwd, &cli.config, cli.index.as_deref());

    match cli.command {
        Commands::Init { force } => commands::init::run(&cwd.join(&cli.config), force),
        Commands::Update => commands::update::run(&load()?),
        Commands::Prepare {
            output,
            cache,
            missing,
        } => commands::prepare::run(
            &load()?,
            &filters,
            &commands::prepare::PrepareArgs {
                output: output.map(|p| cwd.join(p)),
                cache: cache.map(|p| cwd.join(p)),
                missing: missing.map(|p| cwd.join(p)),
            },
        ),
        Commands::Report { tree, json } => commands::report::run(&load()?, &filters, tree, json),
        Commands::Verify { output } => {
            commands::verify::run(&load()?, output.map(|p| cwd.join(p)).as_deref())
        }
    }
}

/// Load the configuration, with a command-line index path taking precedence.
fn load_config(cwd: &Path, path: &Path, index: Option<&Path>) -> anyhow::Result<Config> {
    let path = cwd.join(path);
    if !path.is_file() {
        anyhow::bail!(
            "no {} found (run `topcrates init` first)",
            path.display()
        );
    }
    let mut config =
        Config::load(&path).with_context(|| format!("loading {}", path.display()))?;
    if let Some(index) = index {
        config.paths.index = cwd.join(index);
    }
    Ok(config)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use commands::prepare::{prepare, PrepareArgs};
    use topcrates_index::{IndexDependency, IndexRecord, MemoryIndex, Version};
    use topcrates_mirror::{verify_mirror, ArchiveCache, Checksum};

    struct Workspace {
        dir: tempfile::TempDir,
        config: Config,
    }

    impl Workspace {
        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }
    }

    fn record(cache: &ArchiveCache, name: &str, vers: &str) -> IndexRecord {
        let data = format!("{name}-{vers} contents").into_bytes();
        cache
            .store(name, &Version::parse(vers).unwrap(), &data)
            .unwrap();
        IndexRecord::new(name, vers).with_cksum(Checksum::compute(&data).to_string())
    }

    /// A configuration, index checkout, statistics file and archive cache.
    fn workspace(config: &str) -> Workspace {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let cache = ArchiveCache::new(root.join("crates"));

        MemoryIndex::new()
            .with(
                record(&cache, "tokio", "1.35.0")
                    .with_dep(IndexDependency::new("mio", "^0.8"))
                    .with_dep(IndexDependency::new("bytes", "^1"))
                    .with_dep(
                        IndexDependency::new("windows-sys", "^0.48").with_target("cfg(windows)"),
                    )
                    .with_dep(IndexDependency::new("ancient", "^9")),
            )
            .with(record(&cache, "mio", "0.8.10").with_dep(IndexDependency::new("libc", "^0.2")))
            .with(record(&cache, "libc", "0.2.151"))
            .with(record(&cache, "bytes", "1.5.0"))
            .with(record(&cache, "windows-sys", "0.48.0"))
            .with(record(&cache, "ancient", "1.0.0"))
            .with(record(&cache, "serde", "1.0.193"))
            .with(IndexRecord::new("uncached", "0.1.0"))
            .write_to(&root.join("crates.io-index"))
            .unwrap();

        std::fs::write(
            root.join("crate-stats.json"),
            r#"{"crates":[
                {"name":"tokio","downloads":900,"categories":["network-programming","asynchronous"]},
                {"name":"bytes","downloads":800,"categories":["network-programming"]},
                {"name":"serde","downloads":1000,"categories":["encoding"]}
            ]}"#,
        )
        .unwrap();

        let path = root.join(CONFIG_FILE);
        std::fs::write(&path, config).unwrap();
        let config = load_config(root, Path::new(CONFIG_FILE), None).unwrap();
        Workspace { dir, config }
    }

    fn default_args() -> PrepareArgs {
        PrepareArgs::default()
    }

    #[test]
    fn cli_parses_global_filters() {
        let cli = Cli::try_parse_from([
            "topcrates",
            "--category",
            "filesystem",
            "prepare",
            "--target",
            "x86_64-unknown-linux-gnu",
            "--missing",
            "missing.json",
            "-v",
        ])
        .unwrap();
        assert_eq!(cli.categories, vec!["filesystem"]);
        assert_eq!(cli.targets, vec!["x86_64-unknown-linux-gnu"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from(CONFIG_FILE));
        assert!(matches!(
            cli.command,
            Commands::Prepare { missing: Some(_), .. }
        ));
    }

    #[test]
    fn missing_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path(), Path::new("nope.toml"), None).unwrap_err();
        assert!(err.to_string().contains("topcrates init"));
    }

    #[test]
    fn init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        commands::init::run(&path, false).unwrap();
        assert!(commands::init::run(&path, false).is_err());
        commands::init::run(&path, true).unwrap();
        let config = load_config(dir.path(), Path::new(CONFIG_FILE), None).unwrap();
        assert_eq!(config.top_crates, 100);
    }

    #[test]
    fn index_override() {
        let ws = workspace("additions = [\"serde\"]\n");
        let config = load_config(
            ws.dir.path(),
            Path::new(CONFIG_FILE),
            Some(Path::new("elsewhere")),
        )
        .unwrap();
        assert_eq!(config.index_dir(), ws.path("elsewhere"));
    }

    /// prepare → rerun → verify on a linux-only mirror.
    #[test]
    fn prepare_rerun_verify_workflow() {
        let ws = workspace(
            "categories = [{ network-programming = 1 }]\nadditions = [\"serde\"]\n\n\
             [closure]\ntargets = [\"x86_64-unknown-linux-gnu\"]\n",
        );

        let report = prepare(&ws.config, &Filters::default(), &default_args()).unwrap();
        assert!(report.is_complete());
        // tokio, mio, libc, bytes, serde; windows-sys filtered, ancient unsatisfiable.
        assert_eq!(report.copied.len(), 5);
        assert!(ws.path("local-registry/index/to/ki/tokio").is_file());
        assert!(ws.path("local-registry/tokio-1.35.0.crate").is_file());
        assert!(!ws.path("local-registry/windows-sys-0.48.0.crate").exists());
        assert!(!ws.path("local-registry/index/an/ci/ancient").exists());

        let again = prepare(&ws.config, &Filters::default(), &default_args()).unwrap();
        assert!(again.copied.is_empty());
        assert!(again.indexed.is_empty());
        assert_eq!(again.skipped.len(), 5);

        let verified = verify_mirror(&ws.path("local-registry")).unwrap();
        assert_eq!(verified.verified, 5);
        commands::verify::run(&ws.config, None).unwrap();
    }

    #[test]
    fn target_flag_overrides_configuration() {
        let ws = workspace(
            "additions = [\"tokio\"]\n\n[closure]\ntargets = [\"x86_64-unknown-linux-gnu\"]\n",
        );
        let filters = Filters {
            targets: vec!["x86_64-pc-windows-msvc".to_string()],
            ..Default::default()
        };
        let report = prepare(&ws.config, &filters, &default_args()).unwrap();
        assert!(ws.path("local-registry/windows-sys-0.48.0.crate").is_file());
        assert_eq!(report.copied.len(), 5);
    }

    #[test]
    fn missing_archives_are_listed() {
        let ws = workspace("additions = [\"uncached\", \"serde\"]\n");
        let args = PrepareArgs {
            missing: Some(ws.path("missing.json")),
            output: Some(ws.path("out")),
            ..Default::default()
        };
        let report = prepare(&ws.config, &Filters::default(), &args).unwrap();
        assert_eq!(report.missing.len(), 1);
        assert!(ws.path("out/serde-1.0.193.crate").is_file());

        let missing: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(ws.path("missing.json")).unwrap())
                .unwrap();
        assert_eq!(missing[0]["name"], "uncached");
    }

    #[test]
    fn report_json_and_tree() {
        let ws = workspace("top-crates = 1\ncategories = [{ network-programming = 2 }]\n");
        let json = commands::report::render(&ws.config, &Filters::default(), false, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["selected"], serde_json::json!(["bytes", "serde", "tokio"]));
        assert_eq!(value["packages"]["windows-sys"][0], "0.48.0");
        assert_eq!(value["omissions"][0]["name"], "ancient");

        let tree = commands::report::render(&ws.config, &Filters::default(), true, false).unwrap();
        assert!(tree.contains("tokio v1.35.0\n"));
        assert!(tree.contains("└── libc v0.2.151"));
        assert!(tree.contains("bytes v1.5.0 (*)"));
        assert!(!ws.path("local-registry").exists());
    }

    #[test]
    fn missing_index_is_an_error() {
        let ws = workspace("additions = [\"serde\"]\n");
        std::fs::remove_dir_all(ws.path("crates.io-index")).unwrap();
        let err = prepare(&ws.config, &Filters::default(), &default_args()).unwrap_err();
        assert!(format!("{err:#}").contains("topcrates update"));
    }

    #[test]
    fn verify_reports_corruption() {
        let ws = workspace("additions = [\"serde\"]\n");
        prepare(&ws.config, &Filters::default(), &default_args()).unwrap();
        std::fs::write(ws.path("local-registry/serde-1.0.193.crate"), b"bitrot").unwrap();
        assert!(commands::verify::run(&ws.config, None).is_err());
    }
}
