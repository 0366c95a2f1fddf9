//! Update options offered per content kind.

use super::EntryKind;
use crate::mods::chain_hooks;
use crate::option::{default_update_options, UpdateOption};
use cm_core::paths;

fn is_one_of(relative: &str, files: &[&str]) -> bool {
    files.iter().any(|f| paths::eq_ignore_case(relative, f))
}

/// `skins/<any>/<file>`
fn is_skin_file(relative: &str, file: &str) -> bool {
    let mut parts = relative.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(skins), Some(_), Some(name), None)
            if paths::eq_ignore_case(skins, "skins") && paths::eq_ignore_case(name, file)
    )
}

fn is_car_ui(relative: &str) -> bool {
    is_one_of(relative, &["ui/ui_car.json", "ui/brand.png", "logo.png"])
        || is_skin_file(relative, "ui_skin.json")
}

fn car_options() -> Vec<UpdateOption> {
    let mut options = default_update_options();
    options.push(UpdateOption::new("Keep UI information", false).with_filter(|p| !is_car_ui(p)));
    options.push(
        UpdateOption::new("Keep skins previews", false)
            .with_filter(|p| !is_skin_file(p, "preview.jpg")),
    );
    options.push(
        UpdateOption::new("Keep UI information & skins previews", false)
            .with_filter(|p| !is_car_ui(p) && !is_skin_file(p, "preview.jpg")),
    );
    options.push(
        UpdateOption::new("Keep existing skins", false)
            .with_filter(|p| !paths::is_affected_by(p, "skins")),
    );
    options
}

fn car_skin_options() -> Vec<UpdateOption> {
    let mut options = default_update_options();
    options.push(
        UpdateOption::new("Keep preview", false)
            .with_filter(|p| !paths::eq_ignore_case(p, "preview.jpg")),
    );
    options.push(
        UpdateOption::new("Keep UI information", false)
            .with_filter(|p| !paths::eq_ignore_case(p, "ui_skin.json")),
    );
    options
}

/// An additive track install lands next to layouts that stay installed, so
/// it never offers to wipe the track directory.
fn track_options(additive: bool) -> Vec<UpdateOption> {
    let mut options = if additive {
        vec![UpdateOption::update_everything()]
    } else {
        default_update_options()
    };
    options.push(UpdateOption::new("Keep UI information", false).with_filter(|p| {
        !(paths::is_affected_by(p, "ui")
            && is_one_of(
                paths::file_name(p),
                &["ui_track.json", "preview.png", "outline.png"],
            ))
    }));
    options
}

fn showroom_options() -> Vec<UpdateOption> {
    let mut options = default_update_options();
    options.push(
        UpdateOption::new("Keep UI information", false)
            .with_filter(|p| !is_one_of(p, &["ui/ui_showroom.json", "ui/preview.jpg"])),
    );
    options
}

fn weather_options() -> Vec<UpdateOption> {
    vec![
        UpdateOption::update_everything().with_clean_up(|dir| vec![dir.join("clouds")]),
        UpdateOption::remove_existing_first(),
    ]
}

/// Fonts and themes share their kind directory with every other object of
/// the kind, so a clean install only removes the object's own members.
fn shared_directory_options(id: &str, extension: &'static str) -> Vec<UpdateOption> {
    let file = format!("{id}.{extension}");
    let dir = id.to_string();
    vec![
        UpdateOption::update_everything(),
        UpdateOption::new("Remove existing first", false)
            .as_clean_install()
            .with_clean_up(move |destination| {
                vec![
                    paths::join_relative(destination, &file),
                    paths::join_relative(destination, &dir),
                ]
            }),
    ]
}

fn config_file_options(exists: bool) -> Vec<UpdateOption> {
    let mut options = vec![UpdateOption::new("Replace existing file", false)];
    if exists {
        options.push(UpdateOption::new("Keep existing file", false).with_filter(|_| false));
    }
    options
}

fn generic_mod_options(kind: &EntryKind, name: &str, exists: bool) -> Vec<UpdateOption> {
    let EntryKind::GenericMod { enabler } = kind else {
        return default_update_options();
    };
    if !exists {
        return default_update_options();
    }
    [UpdateOption::update_everything(), UpdateOption::remove_existing_first()]
        .into_iter()
        .map(|option| {
            let (before, after) = chain_hooks(enabler.clone(), name);
            option.with_hooks(before, after)
        })
        .collect()
}

/// Options for an entry; never empty, and the first one never filters.
pub(crate) fn options_for(kind: &EntryKind, id: &str, exists: bool) -> Vec<UpdateOption> {
    match kind {
        EntryKind::Car => car_options(),
        EntryKind::CarSkin { .. } => car_skin_options(),
        EntryKind::Track(track) => track_options(exists && track.no_conflict_mode()),
        EntryKind::TrackSkin { .. } => default_update_options(),
        EntryKind::Showroom => showroom_options(),
        EntryKind::Weather => weather_options(),
        EntryKind::PythonApp => default_update_options(),
        EntryKind::Font => shared_directory_options(id, "txt"),
        EntryKind::Theme => shared_directory_options(id, "xaml"),
        EntryKind::ConfigFile { .. } => config_file_options(exists),
        EntryKind::GenericMod { .. } => generic_mod_options(kind, id, exists),
    }
}
