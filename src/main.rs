use clap::{Parser, ValueEnum};
use colored::Colorize;
use env_logger::Env;
use libartquiz::inat::{ApiQuery, InatClient, INAT_BASE, MAX_OBSERVATIONS};
use libartquiz::pipeline::Pipeline;
use libartquiz::quiz::{Level, QuizSettings};
use libartquiz::source::DataSource;
use libartquiz::taxonomy::EnrichmentConfig;
use libartquiz::Error;
use log::{debug, info, warn};
use std::path::PathBuf;

mod cli;

#[derive(Debug, PartialEq)]
enum Choice {
    Option(usize),
    DontKnow,
    Quit,
}

impl Choice {
    fn from_str(choices_count: usize, input: &str) -> Choice {
        match input {
            "q" => Choice::Quit,
            input => match input.parse::<usize>() {
                Ok(num) if (1..=choices_count).contains(&num) => Choice::Option(num - 1),
                Ok(_) => {
                    println!(
                        "{}",
                        format!("There are only {} options available!", choices_count)
                            .bright_red()
                    );
                    Choice::DontKnow
                }
                Err(_) => Choice::DontKnow,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Observations from the iNaturalist API
    Api,
    /// Pre-built vocabulary files
    Vocab,
}

#[derive(Parser, Debug)]
#[command(name = "artquiz")]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_enum, default_value = "api")]
    source: SourceKind,
    /// iNaturalist project id or slug
    #[arg(short, long)]
    project: Option<String>,
    #[arg(long = "vocab", value_name = "FILE")]
    vocab: Vec<PathBuf>,
    #[arg(long, default_value = "species")]
    level: Level,
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    question_count: u32,
    #[arg(short, long, default_value = "4", value_parser = clap::value_parser!(u32).range(2..))]
    choices_count: u32,
    #[arg(long, default_value = "sv")]
    locale: String,
    #[arg(long, default_value_t = MAX_OBSERVATIONS)]
    per_page: u32,
    #[arg(long, default_value = "research")]
    quality_grade: String,
    #[arg(long, default_value = INAT_BASE)]
    api_base: String,
    /// Skip the taxonomy lookups (family and broad group stay as loaded)
    #[arg(long)]
    offline: bool,
    #[arg(short, long, default_value = "error")]
    log_level: String,
}

fn main() -> Result<(), Error> {
    //INIT START
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level.as_str()))
        .init();

    let client = InatClient::new(args.api_base.as_str());
    let source = match args.source {
        SourceKind::Api => DataSource::Api(ApiQuery {
            project_id: args.project.clone(),
            per_page: args.per_page,
            quality_grade: args.quality_grade.clone(),
            locale: args.locale.clone(),
            ..ApiQuery::default()
        }),
        SourceKind::Vocab => DataSource::Vocabulary(args.vocab.clone()),
    };
    debug!("[Setup] Source: {:?}", source);

    let loaded = Pipeline::load(&client, &source).map(|pipeline| {
        if args.offline {
            info!("[Setup] Offline, skipping taxonomy enrichment.");
            return pipeline;
        }
        let pipeline = pipeline.enrich(&client, &EnrichmentConfig::default());
        if let Some(report) = pipeline.enrichment().filter(|r| !r.is_complete()) {
            warn!(
                "[Setup] Taxonomy incomplete: {}/{} taxa resolved. Family quizzes may be short.",
                report.resolved, report.requested
            );
        }
        pipeline
    });
    if let Ok(pipeline) = &loaded {
        debug!("[Setup] {} observations ready.", pipeline.observations().len());
    }

    let settings = QuizSettings {
        question_count: args.question_count as usize,
        options_per_question: args.choices_count as usize,
    };
    // INIT DONE

    cli::cli_loop(&client, &loaded, args.level, settings)?;
    loaded.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_parse_to_zero_based_options() {
        assert_eq!(Choice::from_str(4, "1"), Choice::Option(0));
        assert_eq!(Choice::from_str(4, "4"), Choice::Option(3));
        assert_eq!(Choice::from_str(4, "q"), Choice::Quit);
        assert_eq!(Choice::from_str(4, "0"), Choice::DontKnow);
        assert_eq!(Choice::from_str(4, "5"), Choice::DontKnow);
        assert_eq!(Choice::from_str(4, "dunno"), Choice::DontKnow);
    }

    #[test]
    fn args_default_to_a_species_quiz() {
        let args = Args::parse_from(["artquiz", "--project", "bioblitz"]);
        assert_eq!(args.source, SourceKind::Api);
        assert_eq!(args.level, Level::Species);
        assert_eq!(args.question_count, 10);
        assert_eq!(args.choices_count, 4);
        assert!(!args.offline);

        let args = Args::parse_from([
            "artquiz", "-s", "vocab", "--vocab", "a.json", "--vocab", "b.json", "--level", "family",
        ]);
        assert_eq!(args.vocab.len(), 2);
        assert_eq!(args.level, Level::Family);
        assert!(Args::try_parse_from(["artquiz", "-c", "1"]).is_err());
    }

    #[test]
    fn empty_quizzes_are_rejected_up_front() {
        assert!(Args::try_parse_from(["artquiz", "-q", "0"]).is_err());
        assert_eq!(Args::parse_from(["artquiz", "-q", "1"]).question_count, 1);
    }
}
