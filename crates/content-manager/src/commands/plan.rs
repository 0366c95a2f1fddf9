use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::{self, AppConfig};
use crate::utils::version_change;
use camino::{Utf8Path, Utf8PathBuf};
use cm_install::{
    detect_entries, Cancellation, ContentEntry, ContentKind, FsContentLibrary, FsPayload,
    InstallationDetails, InstallationPlanner, PlanReport, ResolvedFiles, SkippedEntry, TrackLabel,
};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

pub struct PlanArgs {
    pub payload: Utf8PathBuf,
    pub game_root: Option<Utf8PathBuf>,
    pub clean: bool,
    pub json: bool,
    pub config_path: Option<Utf8PathBuf>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    entries: Vec<JsonEntry<'a>>,
    installs: Vec<JsonInstall<'a>>,
    skipped: &'a [SkippedEntry],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonEntry<'a> {
    id: String,
    kind: ContentKind,
    name: &'a str,
    version: Option<&'a str>,
    existing_version: Option<&'a str>,
    is_new: bool,
    is_newer: bool,
    is_older: bool,
    option: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    track: Option<JsonTrack<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonTrack<'a> {
    label: TrackLabel,
    overlapped_models: &'a [String],
    keep_existing_shared_models: bool,
    missing_models: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonInstall<'a> {
    id: &'a str,
    kind: ContentKind,
    destination: &'a Utf8Path,
    remove_existing: bool,
    clean_up_paths: &'a [Utf8PathBuf],
    #[serde(flatten)]
    files: ResolvedFiles,
}

fn library_for(game_root: Utf8PathBuf, cfg: &AppConfig) -> FsContentLibrary {
    let mut library = FsContentLibrary::new(game_root);
    if let Some(dir) = &cfg.mods_dir {
        library = library.with_mods_dir(dir.clone());
    }
    if let Some(dir) = &cfg.themes_dir {
        library = library.with_themes_dir(dir.clone());
    }
    library
}

pub async fn plan_payload(args: PlanArgs) -> Result<()> {
    let config_path = config::config_path(args.config_path.as_deref())?;
    let cfg = config::load_config(&config_path);

    let game_root = args
        .game_root
        .or_else(|| cfg.game_root.clone())
        .ok_or(CliError::GameRootNotSet)?;
    if !game_root.is_dir() {
        return Err(CliError::game_root_not_found(game_root).into());
    }
    if !args.payload.is_dir() {
        return Err(CliError::payload_not_found(args.payload).into());
    }

    let mut settings = cfg.install.clone();
    if args.clean {
        settings.prefer_clean_install = true;
    }

    let payload = FsPayload::open(args.payload.clone()).map_err(CliError::from)?;
    let library = library_for(game_root, &cfg);

    let mut entries = detect_entries(&payload, &settings).map_err(CliError::from)?;
    let planner = InstallationPlanner::new(settings);
    planner.initialize(&mut entries, &library).await;
    let report = planner.plan(&entries, &library, &Cancellation::new());

    if args.json {
        print_json(&entries, &report, &payload)
    } else {
        print_report(&entries, &report, &payload);
        Ok(())
    }
}

fn print_json(entries: &[ContentEntry], report: &PlanReport, payload: &FsPayload) -> Result<()> {
    let json = JsonReport {
        entries: entries.iter().map(json_entry).collect(),
        installs: report
            .installs
            .iter()
            .map(|details| JsonInstall {
                id: &details.entry_id,
                kind: details.kind,
                destination: &details.destination,
                remove_existing: details.remove_existing,
                clean_up_paths: &details.clean_up_paths,
                files: details.resolve(payload),
            })
            .collect(),
        skipped: &report.skipped,
    };
    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
    Ok(())
}

fn json_entry(entry: &ContentEntry) -> JsonEntry<'_> {
    JsonEntry {
        id: entry.object_id(),
        kind: entry.content_kind(),
        name: entry.name(),
        version: entry.version(),
        existing_version: entry.existing_version(),
        is_new: entry.is_new(),
        is_newer: entry.is_newer(),
        is_older: entry.is_older(),
        option: entry.selected_option().display_name(),
        track: entry.track_entry().map(|track| JsonTrack {
            label: track.label(),
            overlapped_models: track.overlapped_models(),
            keep_existing_shared_models: track.keep_existing_shared_models(),
            missing_models: track.missing_kn5_files(),
        }),
    }
}

fn print_report(entries: &[ContentEntry], report: &PlanReport, payload: &FsPayload) {
    if entries.is_empty() {
        println!("{}", "✗ No installable content found".bright_yellow().bold());
        return;
    }

    println!();
    println!("{}", "📦 Detected content:".bright_blue().bold());
    for entry in entries {
        print_entry(entry);
    }

    if !report.installs.is_empty() {
        println!();
        println!("{}", "📁 Planned installs:".bright_magenta().bold());
        for details in &report.installs {
            print_install(details, payload);
        }
    }

    if !report.skipped.is_empty() {
        println!();
        println!("{}", "⏭️  Skipped:".bright_yellow().bold());
        for skipped in &report.skipped {
            println_pad!(
                "{} {} {}",
                "•".bright_yellow(),
                skipped.id.bright_white(),
                format!("({:?})", skipped.reason).dimmed()
            );
        }
    }
    println!();
}

fn print_entry(entry: &ContentEntry) {
    let status = if entry.is_new() {
        "new".bright_green().to_string()
    } else {
        let change = version_change(entry.existing_version(), entry.version());
        if entry.is_older() {
            format!("{} {}", "downgrade".bright_red(), change)
        } else {
            format!("{} {}", "update".bright_cyan(), change)
        }
    };

    println_pad!(
        "{} {} {} {}",
        format!("{}:", entry.content_kind()).bright_white(),
        entry.name().bright_cyan().bold(),
        format!("[{}]", entry.object_id()).dimmed(),
        status
    );
    println_pad!(
        "  {} {}",
        "option:".dimmed(),
        entry.selected_option().display_name()
    );

    let Some(track) = entry.track_entry() else {
        return;
    };
    println_pad!("  {} {}", "layouts:".dimmed(), track.label());
    if track.shared_models_overlap() {
        let action = if track.keep_existing_shared_models() {
            "kept as installed"
        } else {
            "overwritten"
        };
        println_pad!(
            "  {} {} {}",
            "⚠ shared models".bright_yellow(),
            track.display_overlapped_models(),
            format!("({action})").dimmed()
        );
    }
    if !track.missing_kn5_files().is_empty() {
        println_pad!(
            "  {} {}",
            "✗ missing models".bright_red(),
            track.missing_kn5_files().join(", ")
        );
    }
}

fn print_install(details: &InstallationDetails, payload: &FsPayload) {
    let resolved = details.resolve(payload);
    println_pad!(
        "{} {} {} {}",
        "•".bright_cyan(),
        details.entry_id.bright_cyan().bold(),
        "→".dimmed(),
        details.destination
    );
    if details.remove_existing {
        println_pad!("  {}", "removes existing content first".bright_yellow());
    }
    for path in &details.clean_up_paths {
        println_pad!("  {} {}", "clean up".bright_yellow(), path);
    }
    for file in &resolved.files {
        println_pad!("  {} {}", file.key.dimmed(), file.destination);
    }
    for dir in &resolved.directories {
        println_pad!("  {} {}/", dir.key.dimmed(), dir.destination);
    }
    println_pad!(
        "  {}",
        format!("{} files", resolved.files.len()).bright_white()
    );
}
