use crate::error::Error;
use crate::observation::Observation;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

pub const QUESTIONS_COUNT: usize = 10;
pub const OPTIONS_PER_QUESTION: usize = 4;

/// Taxonomic level the quiz asks about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Level {
    #[default]
    Species,
    Genus,
    Family,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Species, Level::Genus, Level::Family];

    /// Grouping key of an observation at this level.
    pub fn label_of(self, observation: &Observation) -> Option<&str> {
        let label = match self {
            Level::Species => Some(observation.scientific_name()),
            Level::Genus => observation.genus(),
            Level::Family => observation.family(),
        };
        label.filter(|l| !l.is_empty())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Species => "species",
            Level::Genus => "genus",
            Level::Family => "family",
        })
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "species" => Ok(Level::Species),
            "genus" => Ok(Level::Genus),
            "family" => Ok(Level::Family),
            other => Err(Error::InvalidLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    pub question_count: usize,
    pub options_per_question: usize,
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            question_count: QUESTIONS_COUNT,
            options_per_question: OPTIONS_PER_QUESTION,
        }
    }
}

/// One distinct label at the active level, represented by the first
/// observation carrying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub label: String,
    pub representative: Observation,
    pub broad_group: Option<String>,
}

impl Group {
    fn to_option(&self, level: Level) -> QuizOption {
        QuizOption {
            label: self.label.clone(),
            common_name: match level {
                Level::Species => self.representative.common_name().map(str::to_string),
                Level::Genus | Level::Family => None,
            },
            photo_url: Some(self.representative.photo_url().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOption {
    pub label: String,
    pub common_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub level: Level,
    pub answer: Group,
    pub options: Vec<QuizOption>,
}

impl Question {
    pub fn is_correct(&self, label: &str) -> bool {
        self.answer.label == label
    }

    pub fn option_is_correct(&self, index: usize) -> bool {
        self.options
            .get(index)
            .is_some_and(|option| self.is_correct(&option.label))
    }

    pub fn correct_index(&self) -> Option<usize> {
        self.options.iter().position(|o| self.is_correct(&o.label))
    }

    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.correct_index().map(|idx| &self.options[idx])
    }
}

/// Deduplicates observations into groups keyed by their label at `level`.
/// Observations without a label at that level are dropped; insertion order
/// is kept.
pub fn group_observations(observations: &[Observation], level: Level) -> Vec<Group> {
    let mut seen = HashSet::new();
    let mut groups = Vec::new();
    for observation in observations {
        let Some(label) = level.label_of(observation) else {
            continue;
        };
        if seen.insert(label.to_string()) {
            groups.push(Group {
                label: label.to_string(),
                representative: observation.clone(),
                broad_group: observation.broad_group().map(str::to_string),
            });
        }
    }
    groups
}

/// Builds up to `settings.question_count` questions, one per sampled group.
///
/// An empty result means the level has too few distinct groups to fill a
/// question; callers should suggest another level.
pub fn build_questions<R: Rng + ?Sized>(
    rng: &mut R,
    observations: &[Observation],
    level: Level,
    settings: QuizSettings,
) -> Vec<Question> {
    let now = Instant::now();
    let groups = group_observations(observations, level);
    debug!(
        "[Setup] {} observations make {} {} groups.",
        observations.len(),
        groups.len(),
        level
    );
    if groups.is_empty() {
        return Vec::new();
    }
    if groups.len() < settings.options_per_question {
        warn!(
            "[Setup] Only {} {} groups, {} needed per question.",
            groups.len(),
            level,
            settings.options_per_question
        );
        return Vec::new();
    }

    let mut picks: Vec<usize> = (0..groups.len()).collect();
    picks.shuffle(rng);
    picks.truncate(settings.question_count.min(groups.len()));

    let distractor_count = settings.options_per_question.saturating_sub(1);
    let questions: Vec<Question> = picks
        .into_iter()
        .map(|idx| {
            let answer = &groups[idx];
            let mut options = vec![answer.to_option(level)];
            options.extend(
                pick_distractors(&mut *rng, &groups, idx, distractor_count)
                    .into_iter()
                    .map(|g| g.to_option(level)),
            );
            options.shuffle(&mut *rng);
            Question {
                level,
                answer: answer.clone(),
                options,
            }
        })
        .collect();

    debug!(
        "[Setup] Initialized {} questions in {} ms.",
        questions.len(),
        now.elapsed().as_millis()
    );
    questions
}

/// Prefers groups from the answer's broad group; falls back to every other
/// group when that pool is too small.
fn pick_distractors<'a, R: Rng + ?Sized>(
    rng: &mut R,
    groups: &'a [Group],
    answer_idx: usize,
    count: usize,
) -> Vec<&'a Group> {
    let answer = &groups[answer_idx];
    let others = move || {
        groups
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != answer_idx)
            .map(|(_, g)| g)
    };

    let same_group: Vec<&Group> = match answer.broad_group.as_deref() {
        Some(broad) => others()
            .filter(|g| g.broad_group.as_deref() == Some(broad))
            .collect(),
        None => Vec::new(),
    };

    let mut pool = if same_group.len() >= count {
        same_group
    } else {
        debug!(
            "[Setup] {:?} has {} same-group candidates, sampling from all groups.",
            answer.label,
            same_group.len()
        );
        others().collect()
    };
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}
