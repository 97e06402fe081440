//! `skillet search`

use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use comfy_table::{Table, presets};

use skillet::registry;
use skillet::source;
use skillet::types::ArtifactType;

use crate::cmd::load_config;

pub(crate) fn run(project: &Path, query: &str, type_filter: Option<&str>) -> Result<()> {
    let config = load_config(project)?;
    let type_filter = type_filter
        .map(ArtifactType::from_str)
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(vec!["NAME", "KIND", "VERSION", "ORIGIN", "DESCRIPTION"]);

    let mut hits = 0usize;
    for reg_source in &config.registries {
        let reg = registry::open(reg_source)?;
        for entry in reg.search(query, type_filter)? {
            let kinds = entry
                .kinds
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(",");
            table.add_row(vec![
                entry.name.clone(),
                kinds,
                entry.latest.clone(),
                format!("registry:{}", reg.name()),
                entry.description.clone(),
            ]);
            hits += 1;
        }
    }

    let report = source::build_source_index(&config);
    for (name, err) in &report.failures {
        eprintln!("warning: source '{name}' scan failed: {err}");
    }
    let query_lower = query.to_lowercase();
    for package in report.index.all() {
        if !query_lower.is_empty()
            && !package.name.contains(&query_lower)
            && !package
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query_lower))
        {
            continue;
        }
        if type_filter.is_some_and(|t| t != package.kind) {
            continue;
        }
        table.add_row(vec![
            package.qualified_name.clone(),
            package.kind.to_string(),
            format!("git:{}", &package.commit[..package.commit.len().min(8)]),
            format!("source:{}", package.source),
            package.description.clone().unwrap_or_default(),
        ]);
        hits += 1;
    }

    if hits == 0 {
        println!("No packages found");
    } else {
        println!("{table}");
    }
    Ok(())
}
