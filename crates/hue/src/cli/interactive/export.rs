//! Guided CSV export.

use std::path::PathBuf;

use dialoguer::{Input, Select};
use hue_core::config::timestamp;
use hue_core::{Config, ExportOptions, SecondarySort, SortMethod};

use super::handle_interrupt;
use super::theme::hue_theme;
use crate::cli::export::{default_export_path, run_export};

const SORT_ITEMS: &[&str] = &[
    "Natural (img2 before img10)",
    "Numeric (by first number in the name)",
    "Alphabetical",
];

const SECONDARY_ITEMS: &[&str] = &["Then by prompt name", "Keep file order"];

/// Ask for folder, ordering and destination, then export.
pub fn guided_export(config: &Config) -> anyhow::Result<()> {
    let theme = hue_theme();

    let Some(folder) = handle_interrupt(
        Input::<String>::with_theme(&theme)
            .with_prompt("Results folder")
            .default(config.results_dir().display().to_string())
            .interact_text(),
    )?
    else {
        return Ok(());
    };
    let folder = expand(&folder);

    let Some(sort) = Select::with_theme(&theme)
        .with_prompt("Sort rows by image name")
        .items(SORT_ITEMS)
        .default(0)
        .interact_opt()?
    else {
        return Ok(());
    };

    let Some(secondary) = Select::with_theme(&theme)
        .with_prompt("Rows for the same image")
        .items(SECONDARY_ITEMS)
        .default(0)
        .interact_opt()?
    else {
        return Ok(());
    };

    let default_output = default_export_path(&folder, &timestamp());
    let Some(output) = handle_interrupt(
        Input::<String>::with_theme(&theme)
            .with_prompt("CSV file")
            .default(default_output.display().to_string())
            .interact_text(),
    )?
    else {
        return Ok(());
    };

    run_export(&folder, Some(expand(&output)), options(sort, secondary))
}

fn options(sort: usize, secondary: usize) -> ExportOptions {
    ExportOptions {
        sort: match sort {
            1 => SortMethod::Numeric,
            2 => SortMethod::Alphabetical,
            _ => SortMethod::Natural,
        },
        secondary: match secondary {
            1 => SecondarySort::None,
            _ => SecondarySort::Prompt,
        },
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path.trim()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_indices_map_to_options() {
        let o = options(0, 0);
        assert_eq!(o.sort, SortMethod::Natural);
        assert_eq!(o.secondary, SecondarySort::Prompt);

        let o = options(1, 1);
        assert_eq!(o.sort, SortMethod::Numeric);
        assert_eq!(o.secondary, SecondarySort::None);

        assert_eq!(options(2, 0).sort, SortMethod::Alphabetical);
        assert_eq!(SORT_ITEMS.len(), 3);
        assert_eq!(SECONDARY_ITEMS.len(), 2);
    }
}
