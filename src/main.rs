use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::time::Instant;

use reconcile_lib::corpus::CorpusOverlay;
use reconcile_lib::ingest;
use reconcile_lib::matching::MatcherOptions;
use reconcile_lib::ops::{
    find_duplicate_groups, migrate_to_stable_ids, remove_duplicates, repair_coordinates,
    run_import, ImportOptions, MigrateOptions,
};
use reconcile_lib::report::DEFAULT_SAMPLE_CAP;
use reconcile_lib::store::json_file;
use reconcile_lib::utils::env::load_env;

#[derive(Parser)]
#[command(author, version, about = "Mountain catalog reconciliation toolkit", long_about = None)]
struct Cli {
    /// Corpus snapshot file (JSON array of records)
    #[arg(long, default_value = "data/corpus.json")]
    corpus: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a CSV batch against the corpus
    Import {
        /// Batch CSV file
        batch: PathBuf,

        /// Apply changes (default is dry-run)
        #[arg(long)]
        write: bool,

        /// Stamp new records with their derived stable id
        #[arg(long)]
        durable_ids: bool,

        /// Do not create records for unmatched rows
        #[arg(long)]
        no_create: bool,

        /// Disable the substring fallback match stage
        #[arg(long)]
        strict: bool,

        /// Accept a single exact-name hit without region agreement
        #[arg(long)]
        unique_name: bool,

        /// Detail samples kept per report category
        #[arg(long, default_value_t = DEFAULT_SAMPLE_CAP)]
        sample_cap: usize,
    },
    /// Move records from opaque generated ids onto derived stable ids
    MigrateIds {
        /// Apply changes (default is dry-run)
        #[arg(long)]
        write: bool,

        /// Delete legacy documents after migration
        #[arg(long)]
        delete_legacy: bool,

        /// Restrict the pass to records carrying this tag
        #[arg(long)]
        tag: Option<String>,
    },
    /// List duplicate groups without changing anything
    CheckDuplicates,
    /// Collapse duplicate groups onto one keeper each
    RemoveDuplicates {
        /// Apply changes (default is dry-run)
        #[arg(long)]
        write: bool,
    },
    /// Cast text-typed coordinates back to numbers
    RepairCoords {
        /// Apply changes (default is dry-run)
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    load_env();

    let cli = Cli::parse();
    let start = Instant::now();
    let store = json_file::load(&cli.corpus)?;

    let wrote = match &cli.command {
        Command::Import {
            batch,
            write,
            durable_ids,
            no_create,
            strict,
            unique_name,
            sample_cap,
        } => {
            let rows = ingest::read_batch(batch)
                .with_context(|| format!("Failed to read batch {}", batch.display()))?;
            let opts = ImportOptions {
                write: *write,
                durable_ids: *durable_ids,
                create_missing: !*no_create,
                matcher: MatcherOptions {
                    allow_substring: !*strict,
                    allow_unique_name: *unique_name,
                },
                sample_cap: *sample_cap,
            };
            let report = run_import(&store, &rows, &opts).await?;
            println!("{}", report.summary());
            *write
        }
        Command::MigrateIds {
            write,
            delete_legacy,
            tag,
        } => {
            let opts = MigrateOptions {
                write: *write,
                delete_legacy: *delete_legacy,
                tag: tag.clone(),
            };
            let stats = migrate_to_stable_ids(&store, &opts).await?;
            println!("{:#?}", stats);
            *write
        }
        Command::CheckDuplicates => {
            let corpus = CorpusOverlay::load(&store).await?;
            let groups = find_duplicate_groups(&corpus);
            if groups.is_empty() {
                println!("No duplicate groups found.");
            }
            for group in &groups {
                println!(
                    "{}（{}）: {}",
                    group.normalized_name,
                    group.region,
                    group.ids.join(", ")
                );
            }
            println!("{} duplicate groups.", groups.len());
            false
        }
        Command::RemoveDuplicates { write } => {
            let stats = remove_duplicates(&store, *write).await?;
            println!("{:#?}", stats);
            *write
        }
        Command::RepairCoords { write } => {
            let stats = repair_coordinates(&store, *write).await?;
            println!("{:#?}", stats);
            *write
        }
    };

    if wrote {
        json_file::save(&store, &cli.corpus).await?;
    } else {
        info!("Dry run, corpus file left untouched. Re-run with --write to apply.");
    }
    info!("Done in {:.2?}", start.elapsed());
    Ok(())
}
