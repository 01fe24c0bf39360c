use colored::Colorize;
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;

use clap::Parser;
use libartquiz::inat::{InatClient, SpeciesCountsQuery, INAT_BASE};
use libartquiz::vocab::builder::{
    aggregate, default_groups, fetch_species_counts, output_path, read_groups, write_vocab,
    Backoff, GroupConfig, VocabRank, MAX_SPECIES_PAGES, PER_PAGE, SWEDEN_PLACE_ID,
};
use libartquiz::Error;

/// Fetches the most observed taxa of a region for a set of broad groups and
/// writes one vocabulary file per group.
#[derive(Parser, Debug)]
#[command(name = "build_vocab")]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "DIR", default_value = "data")]
    out: PathBuf,
    /// JSON array of {label, taxon_ids, top_n}; the built-in groups otherwise
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    #[arg(short, long, default_value = "genus")]
    rank: VocabRank,
    #[arg(long, default_value_t = SWEDEN_PLACE_ID)]
    place_id: u64,
    /// Used in the output file names
    #[arg(long, default_value = "sweden")]
    region: String,
    #[arg(long, default_value = "sv")]
    locale: String,
    #[arg(long, default_value_t = MAX_SPECIES_PAGES)]
    max_pages: u32,
    #[arg(long, default_value = INAT_BASE)]
    api_base: String,
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn build_group(client: &InatClient, args: &Args, group: &GroupConfig) -> Result<PathBuf, Error> {
    let backoff = Backoff::default();
    let mut counts = Vec::new();
    for taxon_id in &group.taxon_ids {
        let query = SpeciesCountsQuery {
            taxon_id: *taxon_id,
            place_id: args.place_id,
            per_page: PER_PAGE,
            locale: args.locale.clone(),
        };
        let fetched = fetch_species_counts(client, &query, args.max_pages, &backoff)?;
        info!(
            "{}",
            format!("│ ├ taxon_id={}: {} leaf taxa", taxon_id, fetched.len()).blue()
        );
        counts.extend(fetched);
    }

    let entries = aggregate(&counts, args.rank, group.top_n);
    let path = output_path(&args.out, &group.label, args.rank, &args.region);
    write_vocab(&path, &entries)?;
    info!(
        "{}",
        format!(
            "│ └ wrote {} {} (top {}) to {:?}",
            entries.len(),
            args.rank.plural(),
            group.top_n,
            path
        )
        .green()
    );
    Ok(path)
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str()))
        .init();

    let groups = match &args.config {
        Some(path) => match read_groups(path) {
            Ok(groups) => groups,
            Err(err) => {
                error!("{}", format!("Unable to read group config: {}!", err).red());
                std::process::exit(1);
            }
        },
        None => default_groups(),
    };
    info!(
        "{}",
        format!(
            "Building {} vocabularies into {:?} ({} groups)",
            args.rank,
            args.out,
            groups.len()
        )
        .cyan()
    );

    let client = InatClient::new(args.api_base.as_str());
    let mut failed = 0;
    for group in &groups {
        info!(
            "{}",
            format!("├ Group: {} ({} taxa)", group.label, group.taxon_ids.len()).blue()
        );
        if let Err(err) = build_group(&client, &args, group) {
            error!(
                "{}",
                format!("├ ✘ Group {} failed: {}", group.label, err)
                    .red()
                    .strikethrough()
            );
            failed += 1;
        }
    }

    if failed > 0 {
        error!("{}", format!("{} of {} groups failed.", failed, groups.len()).red());
        std::process::exit(1);
    }
    info!("{}", "Done. Point artquiz at the files with --source vocab --vocab <FILE>.".cyan());
}
