//! `skillet registry` - manage configured registries.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Table, presets};

use skillet::config::{ConfigStore, RegistryKind, RegistrySource};

#[derive(Subcommand)]
pub(crate) enum RegistryCommand {
    /// Add a local registry
    Add {
        /// Unique registry name
        name: String,
        /// Filesystem path of the registry
        path: String,
        /// Mark as the default publish target
        #[arg(long)]
        default: bool,
    },
    /// Remove a registry by name
    Remove { name: String },
    /// List configured registries
    List,
}

pub(crate) fn run(command: RegistryCommand) -> Result<()> {
    let home = skillet::skillet_home();
    match command {
        RegistryCommand::Add {
            name,
            path,
            default,
        } => {
            let mut store = ConfigStore::open_global(&home)?;
            store.add_registry(RegistrySource {
                name: name.clone(),
                url: path,
                kind: RegistryKind::Local,
                default,
            })?;
            store.save()?;
            println!("added registry '{name}'");
        }
        RegistryCommand::Remove { name } => {
            let mut store = ConfigStore::open_global(&home)?;
            store.remove_registry(&name)?;
            store.save()?;
            println!("removed registry '{name}'");
        }
        RegistryCommand::List => {
            let config = skillet::config::Config::load(&home, &std::env::current_dir()?)?;
            if config.registries.is_empty() {
                println!("No registries configured");
                return Ok(());
            }
            let mut table = Table::new();
            table.load_preset(presets::NOTHING);
            table.set_header(vec!["NAME", "TYPE", "PATH", "DEFAULT"]);
            for registry in &config.registries {
                table.add_row(vec![
                    registry.name.clone(),
                    registry.kind.to_string(),
                    registry.url.clone(),
                    if registry.default { "yes" } else { "" }.to_string(),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
