use crate::Choice;
use colored::Colorize;
#[cfg(feature = "kittygfx")]
use kitty_image::{Action, Command, WrappedCommand};
use libartquiz::inat::InatClient;
use libartquiz::observation::Observation;
use libartquiz::pipeline::Pipeline;
use libartquiz::quiz::{Level, Question, QuizSettings};
use libartquiz::state::{Event, Phase, QuizState};
use libartquiz::Error;
use log::{debug, warn};
use rand::rng;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// `None` once stdin is closed.
fn prompt(text: &str) -> Option<String> {
    print!("{} ", text.cyan());
    let _ = io::stdout().flush();
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim().to_string()),
        Err(err) => {
            warn!("[Quiz] Cannot read input: {}", err);
            None
        }
    }
}

/// Empty input and `q` both mean quit.
fn level_choice(input: &str) -> Result<Option<Level>, Error> {
    match input.trim() {
        "" | "q" => Ok(None),
        other => other.parse::<Level>().map(Some),
    }
}

pub fn cli_loop(
    client: &InatClient,
    loaded: &Result<Pipeline, Error>,
    level: Level,
    settings: QuizSettings,
) -> Result<(), Error> {
    let mut state = QuizState::new(level);
    loop {
        let phase = state.phase().clone();
        state = match phase {
            Phase::Loading => match loaded {
                Ok(pipeline) => {
                    let questions = pipeline.questions(&mut rng(), state.level(), settings);
                    debug!("[Setup] Questions: {:?}", questions.len());
                    state.apply(Event::Loaded(questions))
                }
                Err(err) => state.apply(Event::LoadFailed(format!(
                    "Could not load observations: {err}"
                ))),
            },
            Phase::Ready => {
                println!(
                    "{}",
                    format!(
                        "==========> {} ({} questions) <==========",
                        state.level(),
                        state.total()
                    )
                    .cyan()
                );
                state.apply(Event::Start)
            }
            Phase::Asking { index } => {
                let event = match state.current_question() {
                    Some(question) => ask(client, question, index, state.total())?,
                    None => Event::Quit,
                };
                if event == Event::Quit {
                    println!("{}", "Quitting Early!".cyan());
                }
                state.apply(event)
            }
            Phase::Answered { chosen, correct, .. } => {
                if let Some(question) = state.current_question() {
                    show_feedback(question, chosen, correct, state.score());
                }
                state.apply(Event::Next)
            }
            Phase::Finished => {
                println!(
                    "{}",
                    format!("Final score: {}/{}", state.score(), state.total())
                        .black()
                        .bold()
                        .on_white()
                );
                return Ok(());
            }
            Phase::Unavailable { reason } => {
                if loaded.is_err() {
                    println!("{}", reason.bright_red());
                    return Ok(());
                }
                println!("{}", reason.yellow());
                match pick_level() {
                    Some(level) => state.apply(Event::SelectLevel(level)),
                    None => return Ok(()),
                }
            }
        };
    }
}

fn pick_level() -> Option<Level> {
    let levels = Level::ALL
        .iter()
        .map(Level::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    loop {
        let input = prompt(&format!("Try another level ({levels} or q to quit):"))?;
        match level_choice(&input) {
            Ok(level) => return level,
            Err(err) => println!("{}", err.to_string().bright_red()),
        }
    }
}

fn ask(
    client: &InatClient,
    question: &Question,
    index: usize,
    total: usize,
) -> Result<Event, Error> {
    let leading = format!("{}/{}. ", index + 1, total);
    println!(
        "{}{}",
        leading.cyan(),
        format!("Which {} is this?", question.level)
            .black()
            .bold()
            .on_white()
    );

    let indent = " ".repeat(leading.len());
    let photo = &question.answer.representative;
    let shown = match show_photo(client, leading.len(), photo) {
        Ok(shown) => shown,
        Err(err) => {
            warn!("[Quiz] Cannot display photo {}: {}", photo.photo_url(), err);
            println!("{}{}", indent, photo.photo_url().underline());
            None
        }
    };
    println!("{}{}", indent, credit(photo).dimmed());

    for (i, option) in question.options.iter().enumerate() {
        print!("{}{}. ", indent, format!("{}", i + 1).bold());
        match &option.common_name {
            Some(common) => println!("{} ({})", option.label.italic(), common),
            None => println!("{}", option.label.italic()),
        }
    }

    let choices_count = question.options.len();
    let choice_string = prompt(&format!(
        "Answer (1-{}, q to quit prematurely and anything else if you don't know):",
        choices_count
    ));
    discard_photo(shown);
    let Some(choice_string) = choice_string else {
        return Ok(Event::Quit);
    };
    let choice = Choice::from_str(choices_count, choice_string.as_str());
    debug!("choice: {:?}", choice);

    Ok(match choice {
        Choice::Option(num) => Event::Answer(num),
        Choice::DontKnow => Event::Skip,
        Choice::Quit => Event::Quit,
    })
}

fn credit(photo: &Observation) -> String {
    let attribution = photo.attribution();
    let who = attribution
        .text
        .clone()
        .or_else(|| attribution.observer.clone())
        .unwrap_or_else(|| "unknown".to_string());
    format!("Photo: {} ({})", who, photo.license_code())
}

fn show_feedback(question: &Question, chosen: Option<usize>, correct: bool, score: usize) {
    if correct {
        println!("{}", format!("Correct! Score: {}", score).bright_green());
        return;
    }
    if chosen.is_some() {
        println!("{}", format!("Incorrect! Score: {}", score).bright_red());
    }
    if let (Some(idx), Some(option)) = (question.correct_index(), question.correct_option()) {
        println!(
            "{}",
            format!("The correct choice was {}. {}", idx + 1, option.label).green()
        );
    }
}

/// The terminal has read the file by the time the answer is in.
fn discard_photo(shown: Option<PathBuf>) {
    if let Some(path) = shown {
        if let Err(err) = fs::remove_file(&path) {
            debug!("[Quiz] Cannot remove {:?}: {}", path, err);
        }
    }
}

/// Returns the temporary file handed to the terminal, if any.
fn show_photo(
    client: &InatClient,
    indent: usize,
    photo: &Observation,
) -> Result<Option<PathBuf>, Error> {
    let shown;
    cfg_if::cfg_if! {
        if #[cfg(feature = "kittygfx")] {
            let bytes = client.photo_bytes(photo.photo_url())?;
            let picture = image::load_from_memory(&bytes)?;
            let path = std::env::temp_dir().join(format!("artquiz-{}.png", photo.id()));
            picture.save_with_format(&path, image::ImageFormat::Png)?;
            debug!("path at {path:?}");
            let (width, height) = (picture.width(), picture.height());
            let action = Action::TransmitAndDisplay(
                kitty_image::ActionTransmission {
                    format: kitty_image::Format::Png,
                    medium: kitty_image::Medium::File,
                    width,
                    height,
                    ..Default::default()
                },
                kitty_image::ActionPut {
                    x_offset: 10 * indent as u32,
                    ..Default::default()
                },
            );
            let command = WrappedCommand::new(Command::with_payload_from_path(action, &path));
            println!("{command}");
            print!("{}", "\n".repeat(height as usize / 20));
            shown = Some(path);
        } else {
            let _ = client;
            println!("{}{}", " ".repeat(indent), photo.photo_url().underline());
            shown = None;
        }
    }
    Ok(shown)
}
