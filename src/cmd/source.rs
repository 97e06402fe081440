//! `skillet source` - manage configured git sources.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Table, presets};

use skillet::config::{Config, ConfigStore, SourceEntry};
use skillet::source::{self, SourceState};
use skillet::ui::ConsoleReporter;

#[derive(Subcommand)]
pub(crate) enum SourceCommand {
    /// Add a git source
    Add {
        /// Source name, conventionally owner/repo or owner/repo:subpath
        name: String,
        /// Clone URL
        url: String,
        /// Branch or tag to track
        #[arg(long = "ref")]
        reference: Option<String>,
        /// Subpath within the repository to scan
        #[arg(long)]
        subpath: Option<String>,
    },
    /// Remove a source by name
    Remove { name: String },
    /// List configured sources with cache state
    List,
    /// Fetch sources (all, or the named one)
    Refresh { name: Option<String> },
}

pub(crate) async fn run(command: SourceCommand) -> Result<()> {
    let home = skillet::skillet_home();
    match command {
        SourceCommand::Add {
            name,
            url,
            reference,
            subpath,
        } => {
            let mut store = ConfigStore::open_global(&home)?;
            store.add_source(SourceEntry {
                name: name.clone(),
                url,
                reference,
                subpath,
            })?;
            store.save()?;
            println!("added source '{name}'; run 'skillet source refresh' to fetch it");
        }
        SourceCommand::Remove { name } => {
            let mut store = ConfigStore::open_global(&home)?;
            store.remove_source(&name)?;
            store.save()?;
            println!("removed source '{name}'");
        }
        SourceCommand::List => {
            let config = Config::load(&home, &std::env::current_dir()?)?;
            if config.sources.is_empty() {
                println!("No sources configured");
                return Ok(());
            }
            let mut table = Table::new();
            table.load_preset(presets::NOTHING);
            table.set_header(vec!["NAME", "URL", "REF", "COMMIT", "FETCHED", "ARTIFACTS"]);
            for entry in &config.sources {
                let state = SourceState::load(&entry.cache_dir(&home));
                let (commit, fetched, count) = match &state {
                    Some(s) => (
                        s.head_commit[..s.head_commit.len().min(8)].to_string(),
                        s.fetched_at.clone(),
                        s.artifact_count.to_string(),
                    ),
                    None => ("-".into(), "never".into(), "-".into()),
                };
                table.add_row(vec![
                    entry.name.clone(),
                    entry.url.clone(),
                    entry.reference.clone().unwrap_or_else(|| "default".into()),
                    commit,
                    fetched,
                    count,
                ]);
            }
            println!("{table}");
        }
        SourceCommand::Refresh { name } => {
            let config = Config::load(&home, &std::env::current_dir()?)?;
            let reporter = ConsoleReporter;

            let entries: Vec<SourceEntry> = match name {
                Some(name) => {
                    let entry = config
                        .source(&name)
                        .ok_or_else(|| anyhow::anyhow!("source '{name}' is not configured"))?;
                    vec![entry.clone()]
                }
                None => config.sources.clone(),
            };

            if entries.is_empty() {
                println!("No sources configured");
                return Ok(());
            }

            let mut scoped = Config::empty(&home);
            scoped.sources = entries;
            let outcomes = source::refresh_all(&scoped, &reporter).await;

            let mut failures = 0usize;
            for outcome in outcomes {
                match outcome {
                    Ok(o) => {
                        let suffix = if o.stale { " (stale cache)" } else { "" };
                        println!(
                            "{}: {} artifacts at {}{suffix}",
                            o.source,
                            o.state.artifact_count,
                            &o.state.head_commit[..o.state.head_commit.len().min(8)]
                        );
                    }
                    Err(err) => {
                        eprintln!("error: {err}");
                        failures += 1;
                    }
                }
            }
            if failures > 0 {
                anyhow::bail!("{failures} source(s) failed to refresh");
            }
        }
    }
    Ok(())
}
