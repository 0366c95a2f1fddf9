use crate::utils::config;
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::Result;

/// Print a config path entry with status indicator
fn print_path_config(name: &str, path: Option<&Utf8PathBuf>, validator: impl Fn(&Utf8Path) -> bool) {
    match path {
        Some(p) => {
            let status = if validator(p.as_path()) {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {} {}", format!("{}:", name).bright_white(), p, status);
        }
        None => {
            println!(
                "  {} {}",
                format!("{}:", name).bright_white(),
                "(not set)".bright_yellow()
            );
        }
    }
}

fn print_flag(name: &str, value: bool) {
    println!("    {} {}", format!("{}:", name).bright_white(), value);
}

pub fn show_config(explicit: Option<&Utf8Path>) -> Result<()> {
    let path = config::config_path(explicit)?;
    let cfg = config::load_config(&path);

    println!();
    println!("  {} {}", "config_file:".bright_white(), path);
    print_path_config("game_root", cfg.game_root.as_ref(), |p| {
        p.join("content").is_dir()
    });
    print_path_config("mods_dir", cfg.mods_dir.as_ref(), |p| p.is_dir());
    print_path_config("themes_dir", cfg.themes_dir.as_ref(), |p| p.is_dir());

    println!("  {}", "[install]".bright_white());
    print_flag("prefer_clean_install", cfg.install.prefer_clean_install);
    print_flag(
        "keep_existing_shared_models",
        cfg.install.keep_existing_shared_models,
    );
    print_flag(
        "move_empty_directories_for_apps",
        cfg.install.move_empty_directories_for_apps,
    );
    println!();
    Ok(())
}

pub fn init_config(explicit: Option<&Utf8Path>) -> Result<()> {
    let path = config::config_path(explicit)?;
    let (_, created) = config::load_or_create_config(&path)?;

    if created {
        println!("{}", "✓ Configuration created".bright_green().bold());
    } else {
        println!("{}", "Configuration already exists".bright_yellow());
    }
    println!();
    println!("  {} {}", "Config file:".bright_white().bold(), path);
    println!();
    println!(
        "  {}",
        "Set game_root to your game directory before running 'content-manager plan'".bright_cyan()
    );
    Ok(())
}
