//! `pinup` command line

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use pinup_core::{
    FsLocalFiles, LocalFiles, PatchRules, UpdateArtifact, UpdateOutcome, Upgrader, UpgraderConfig,
    UpgradeRequest,
};
use pinup_fragment::{FragmentPath, FragmentRef, ManifestDocument};
use pinup_resolve::{HttpFetcher, MemoryCache};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn cli() -> Command {
    Command::new("pinup")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Upgrade pinned archive rules in Bazel manifests")
        .subcommand_required(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("upgrade")
                .about("Apply upgrade requests to a manifest")
                .arg(
                    Arg::new("manifest")
                        .long("manifest")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Manifest file to upgrade"),
                )
                .arg(
                    Arg::new("requests")
                        .long("requests")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON file with an array of upgrade requests"),
                )
                .arg(
                    Arg::new("root")
                        .long("root")
                        .default_value(".")
                        .value_parser(value_parser!(PathBuf))
                        .help("Repository root for patch files and written output"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Write the manifest in place and patch files under the root"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the outcome as JSON"),
                ),
        )
        .subcommand(
            Command::new("locate")
                .about("Print the value at a dotted path such as 0.urls.1")
                .arg(
                    Arg::new("manifest")
                        .long("manifest")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Manifest file to read"),
                )
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(FragmentPath))
                        .help("Rule index followed by field names and array indices"),
                ),
        )
        .subcommand(
            Command::new("check-patch")
                .about("Check that patch references point at valid patches")
                .arg(
                    Arg::new("root")
                        .long("root")
                        .default_value(".")
                        .value_parser(value_parser!(PathBuf))
                        .help("Repository root"),
                )
                .arg(
                    Arg::new("refs")
                        .required(true)
                        .num_args(1..)
                        .help("Patch references, e.g. //:third_party/foo.patch"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    if let Err(err) = run(&matches).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("upgrade", args)) => upgrade(args).await,
        Some(("locate", args)) => locate(args).await,
        Some(("check-patch", args)) => check_patch(args).await,
        _ => Ok(()),
    }
}

fn path_arg<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .with_context(|| format!("missing --{name}"))
}

async fn upgrade(args: &ArgMatches) -> anyhow::Result<()> {
    let manifest = path_arg(args, "manifest")?;
    let requests_path = path_arg(args, "requests")?;
    let root = path_arg(args, "root")?;

    let config = match args.get_one::<PathBuf>("config") {
        Some(path) => UpgraderConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?,
        None => UpgraderConfig::default(),
    };

    let content = tokio::fs::read_to_string(manifest)
        .await
        .with_context(|| format!("reading {}", manifest.display()))?;
    let requests_json = tokio::fs::read_to_string(requests_path)
        .await
        .with_context(|| format!("reading {}", requests_path.display()))?;
    let requests: Vec<UpgradeRequest> = serde_json::from_str(&requests_json)
        .with_context(|| format!("parsing {}", requests_path.display()))?;

    let files = Arc::new(FsLocalFiles::new(root));
    let fetcher = HttpFetcher::new(config.http_timeout()).context("creating HTTP client")?;
    let upgrader = Upgrader::new(
        config,
        files.clone(),
        Arc::new(fetcher),
        Arc::new(MemoryCache::default()),
    )
    .context("invalid configuration")?;

    let package_file = package_file_name(manifest, root);
    let artifact = UpdateArtifact::new(package_file, requests, content);
    let outcome = upgrader.update_artifacts(&artifact).await;

    if args.get_flag("write") {
        write_outcome(&outcome, &files, &artifact.package_file, manifest).await?;
    }

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }
    Ok(())
}

/// Write changed files; the manifest goes back to `manifest`, patches under the root
async fn write_outcome(
    outcome: &UpdateOutcome,
    files: &FsLocalFiles,
    package_file: &str,
    manifest: &Path,
) -> anyhow::Result<()> {
    for file in outcome.files() {
        if file.path == package_file {
            tokio::fs::write(manifest, &file.contents)
                .await
                .with_context(|| format!("writing {}", manifest.display()))?;
        } else {
            files
                .write(&file.path, file.contents.as_bytes())
                .await
                .with_context(|| format!("writing {}", file.path))?;
        }
    }
    Ok(())
}

/// Manifest path relative to `root`, or its file name if it lies elsewhere
fn package_file_name(manifest: &Path, root: &Path) -> String {
    let relative = manifest
        .strip_prefix(root)
        .ok()
        .or_else(|| manifest.file_name().map(Path::new))
        .unwrap_or(manifest);
    relative.to_string_lossy().into_owned()
}

fn print_outcome(outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::Unchanged => println!("no changes"),
        UpdateOutcome::Changed(files) => {
            for file in files {
                println!("changed {}", file.path);
            }
        }
    }
}

async fn locate(args: &ArgMatches) -> anyhow::Result<()> {
    let manifest = path_arg(args, "manifest")?;
    let Some(path) = args.get_one::<FragmentPath>("path") else {
        bail!("missing fragment path");
    };

    let text = tokio::fs::read_to_string(manifest)
        .await
        .with_context(|| format!("reading {}", manifest.display()))?;
    let document = ManifestDocument::parse(text);
    if let Some(err) = document.parse_error() {
        tracing::warn!(error = %err, "parsing stopped early");
    }

    let Some(fragment) = document.locate(path) else {
        bail!("nothing at {path}");
    };
    let span = fragment.span();
    println!("{} {}..{}", fragment.kind(), span.start, span.end);
    match fragment {
        FragmentRef::String(s) => println!("{}", s.value()),
        FragmentRef::Array(a) => {
            for s in a.strings() {
                println!("{}", s.value());
            }
        }
        FragmentRef::Record(r) => {
            for key in r.keys() {
                println!("{key}");
            }
        }
    }
    Ok(())
}

async fn check_patch(args: &ArgMatches) -> anyhow::Result<()> {
    let root = path_arg(args, "root")?;
    let files = FsLocalFiles::new(root);
    let rules = PatchRules::new(&UpgraderConfig::default().version_fields)?;
    let files: &dyn LocalFiles = &files;

    for reference in args.get_many::<String>("refs").into_iter().flatten() {
        let status = if rules.validate(files, reference).await {
            "valid"
        } else {
            "invalid"
        };
        println!("{reference}: {status}");
    }
    Ok(())
}
