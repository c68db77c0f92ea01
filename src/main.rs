#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use avionics_dtc::airframe::{Airframe, AirframeKind};
use avionics_dtc::airframes::{A10C, F16C};
use avionics_dtc::configuration::Configuration;
use avionics_dtc::links::PropagationReport;
use avionics_dtc::merge::{MergeCoordinator, MergeLock, MergeOutcome};
use avionics_dtc::settings::Settings;
use avionics_dtc::storage::FileStorage;
use avionics_dtc::store::ConfigStore;
use avionics_dtc::templates::{FileTemplates, PlanFileGenerator};

#[derive(Debug, Parser)]
#[command(name = "avionics-dtc", version, about = "Linked avionics configurations for simulated aircraft")]
struct Cli {
    /// Airframe whose configurations to work on
    #[arg(long, short, default_value = "f16c")]
    airframe: AirframeKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List configurations, favorites first
    List {
        #[arg(long)]
        filter: Option<String>,
    },
    Create {
        name: String,
    },
    Copy {
        uid: String,
        name: String,
    },
    Rename {
        uid: String,
        name: String,
    },
    Delete {
        uid: String,
    },
    Favorite {
        uid: String,
        /// Clear the flag instead of setting it
        #[arg(long)]
        off: bool,
    },
    /// Make a system of UID mirror the same system of TARGET
    Link {
        uid: String,
        tag: String,
        target: String,
    },
    /// Remove one link, or every link when no tag is given
    Unlink {
        uid: String,
        tag: Option<String>,
    },
    /// Print or write a sanitized copy for sharing
    Export {
        uid: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    Import {
        path: PathBuf,
    },
    /// Write the simulator data file
    MergeDtc {
        uid: String,
        /// Overrides the configured output path
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Generate kneeboards
    MergeKneeboards {
        uid: String,
        /// Overrides the configured output directory
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn parse_level(level: &str) -> TraceLevel {
    match level.to_lowercase().as_str() {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;

    // LOG_LEVEL wins over the settings file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.log_level.clone());
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&log_level))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(airframe = %cli.airframe, data = %settings.configs_dir().display(), "Starting");
    match cli.airframe {
        AirframeKind::F16C => run::<F16C>(cli.command, &settings),
        AirframeKind::A10C => run::<A10C>(cli.command, &settings),
    }
}

fn parse_tag<A: Airframe>(tag: &str) -> Result<A::Tag> {
    tag.parse::<A::Tag>()
        .with_context(|| format!("{} has no system '{tag}'", A::KIND))
}

fn report_propagation<A: Airframe>(report: &PropagationReport<A>) {
    for event in &report.updated {
        println!("updated linked {}", event.uid);
    }
    for (uid, e) in &report.failures {
        warn!(uid = %uid, error = %e, "Linked configuration not saved");
    }
}

fn run<A: Airframe>(command: Command, settings: &Settings) -> Result<()> {
    let mut store = ConfigStore::<A, _>::new(FileStorage::new(settings.configs_dir()));
    let report = store.load_configurations_for_airframe()?;
    if !report.is_clean() {
        warn!(
            dropped = report.dropped.len(),
            regenerated = report.regenerated.len(),
            "Repaired configuration identities"
        );
    }
    store.unlink_dangling();

    match command {
        Command::List { filter } => {
            store.filter_configs(filter.as_deref(), true);
            for config in store.filtered() {
                let star = if config.is_favorite { "*" } else { " " };
                let links: Vec<String> = config
                    .linked_sys_map
                    .iter()
                    .map(|(tag, target)| format!("{tag}->{target}"))
                    .collect();
                println!("{star} {}  {}  {}", config.uid, config.name, links.join(" "));
            }
        }
        Command::Create { name } => println!("{}", store.create(&name)?),
        Command::Copy { uid, name } => println!("{}", store.copy(&uid, &name)?),
        Command::Rename { uid, name } => store.rename(&uid, &name)?,
        Command::Delete { uid } => store.delete(&uid)?,
        Command::Favorite { uid, off } => store.set_favorite(&uid, !off)?,
        Command::Link { uid, tag, target } => {
            let report = store.link_system(&uid, parse_tag::<A>(&tag)?, &target)?;
            report_propagation(&report);
        }
        Command::Unlink { uid, tag } => {
            let tag = tag.as_deref().map(parse_tag::<A>).transpose()?;
            store.unlink_system(&uid, tag)?;
        }
        Command::Export { uid, output } => {
            let json = store.export_json(&uid)?;
            match output {
                Some(path) => {
                    fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
                    info!(path = %path.display(), "Exported configuration");
                }
                None => println!("{json}"),
            }
        }
        Command::Import { path } => {
            let text = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
            let injected = import(&mut store, &text)?;
            match injected {
                Some(uid) => println!("{uid}"),
                None => println!("stored for another airframe"),
            }
        }
        Command::MergeDtc { uid, output } => {
            let mut config = lookup(&store, &uid)?;
            if output.is_some() {
                config.export.dtc_output_path = output;
            }
            print_outcome(coordinator(settings).save_merged_sim_dtc(&config)?);
        }
        Command::MergeKneeboards { uid, output } => {
            let mut config = lookup(&store, &uid)?;
            if output.is_some() {
                config.export.kneeboard_output_path = output;
            }
            print_outcome(coordinator(settings).save_merged_kboards(&config)?);
        }
    }
    Ok(())
}

fn lookup<A: Airframe>(store: &ConfigStore<A, FileStorage>, uid: &str) -> Result<Configuration<A>> {
    store
        .get(uid)
        .cloned()
        .ok_or_else(|| anyhow!("No {} configuration {uid}", A::KIND))
}

fn coordinator(settings: &Settings) -> MergeCoordinator<FileTemplates, PlanFileGenerator> {
    MergeCoordinator::new(
        MergeLock::new(),
        FileTemplates::new(settings.templates_dir()),
        PlanFileGenerator,
        settings.callsign.clone(),
    )
}

fn print_outcome(outcome: MergeOutcome) {
    match outcome {
        MergeOutcome::Skipped => println!("no output path configured, nothing written"),
        MergeOutcome::Written(paths) => {
            for path in paths {
                println!("{}", path.display());
            }
        }
    }
}

#[derive(Deserialize)]
struct RecordHeader {
    airframe: AirframeKind,
}

/// Inject an exported record, whichever airframe it belongs to
fn import<A: Airframe>(store: &mut ConfigStore<A, FileStorage>, text: &str) -> Result<Option<String>> {
    let header: RecordHeader = serde_json::from_str(text).context("Not a configuration record")?;
    let injected = match header.airframe {
        AirframeKind::F16C => store.inject(parse_record::<F16C>(text)?)?,
        AirframeKind::A10C => store.inject(parse_record::<A10C>(text)?)?,
    };
    Ok(injected)
}

fn parse_record<A: Airframe>(text: &str) -> Result<Configuration<A>> {
    Configuration::from_json(text).ok_or_else(|| anyhow!("Malformed {} configuration record", A::KIND))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_airframe_and_command() {
        let cli = Cli::try_parse_from(["avionics-dtc", "--airframe", "A10C", "link", "u1", "wypt", "u2"]).unwrap();
        assert_eq!(cli.airframe, AirframeKind::A10C);
        let Command::Link { uid, tag, target } = cli.command else {
            panic!("expected link");
        };
        assert_eq!((uid.as_str(), target.as_str()), ("u1", "u2"));
        assert!(parse_tag::<A10C>(&tag).is_ok());
        assert!(parse_tag::<F16C>(&tag).is_err());
    }

    #[test]
    fn test_default_airframe_and_optional_tag() {
        let cli = Cli::try_parse_from(["avionics-dtc", "unlink", "u1"]).unwrap();
        assert_eq!(cli.airframe, AirframeKind::F16C);
        assert!(matches!(cli.command, Command::Unlink { tag: None, .. }));
    }

    #[test]
    fn test_unknown_airframe_rejected() {
        assert!(Cli::try_parse_from(["avionics-dtc", "--airframe", "mig29", "list"]).is_err());
    }

    #[test]
    fn test_parse_level_falls_back_to_info() {
        assert_eq!(parse_level("DEBUG"), TraceLevel::DEBUG);
        assert_eq!(parse_level("verbose"), TraceLevel::INFO);
    }
}
