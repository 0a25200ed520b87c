use anyhow::{Context, bail};
use clap::Parser;
use symbol_search::cli::{Cli, Commands};
use symbol_search::format::{render_results, render_results_json, render_sections};
use symbol_search::index::{DirectorySource, IndexCatalog};
use symbol_search::search::{QueryOutcome, RankedResultSet, SearchSession, SessionSnapshot, SessionState};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    symbol_search::tracing::init(cli.verbose);

    let config = cli.load_config().context("Failed to load configuration")?;
    let source = DirectorySource::new(cli.search_dir());
    let manifest = source
        .manifest()
        .await
        .with_context(|| format!("No search index under {}", cli.docs.display()))?;

    if let Commands::Sections = cli.command {
        print!("{}", render_sections(&manifest)?);
        return Ok(());
    }

    if manifest.section(&config.section).is_none() {
        let known: Vec<_> = manifest.sections().iter().map(|s| s.name.as_str()).collect();
        bail!(
            "Unknown section '{}'. Available: {}",
            config.section,
            known.join(", ")
        );
    }

    let catalog = IndexCatalog::new(manifest, Arc::new(source));
    let session = SearchSession::new(catalog, config);

    match cli.command {
        Commands::Search { query } => {
            let QueryOutcome::Published(results) = session.query(&query).await else {
                bail!("Query '{}' was superseded", query);
            };
            if let Some(error) = session.snapshot().error {
                eprintln!("warning: {}", error);
            }
            print_results(&results, cli.json)?;
        }
        Commands::Interactive => interactive(&session, cli.json).await?,
        Commands::Sections => {}
    }

    Ok(())
}

/// Feeds stdin lines to the session as keystrokes and prints every settled
/// result set until input ends.
async fn interactive(session: &SearchSession, json: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut updates = session.subscribe();
    let mut printed = 0;
    let mut input_open = true;

    loop {
        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) => session.keystroke(&line),
                    None => {
                        input_open = false;
                        if is_settled(&session.snapshot()) {
                            break;
                        }
                    }
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.state == SessionState::Displaying && snapshot.generation != printed {
                    printed = snapshot.generation;
                    if let Some(error) = &snapshot.error {
                        eprintln!("warning: {}", error);
                    }
                    print_results(&snapshot.results, json)?;
                }
                if !input_open && is_settled(&snapshot) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn is_settled(snapshot: &SessionSnapshot) -> bool {
    matches!(snapshot.state, SessionState::Idle | SessionState::Displaying)
}

fn print_results(results: &RankedResultSet, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", render_results_json(results)?);
    } else {
        println!("{}", render_results(results)?);
    }
    Ok(())
}
