use crate::quiz::{Level, Question};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Asking {
        index: usize,
    },
    Answered {
        index: usize,
        chosen: Option<usize>,
        correct: bool,
    },
    Finished,
    Unavailable {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Loaded(Vec<Question>),
    LoadFailed(String),
    Start,
    Answer(usize),
    Skip,
    Next,
    SelectLevel(Level),
    Quit,
}

/// Everything the interaction handler mutates, advanced only through
/// [`QuizState::apply`]. Events that do not fit the current phase are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizState {
    level: Level,
    questions: Vec<Question>,
    phase: Phase,
    score: usize,
}

impl QuizState {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            questions: Vec::new(),
            phase: Phase::Loading,
            score: 0,
        }
    }

    #[must_use]
    pub fn apply(self, event: Event) -> Self {
        match (self.phase.clone(), event) {
            (_, Event::SelectLevel(level)) => Self::new(level),
            (Phase::Loading, Event::Loaded(questions)) if questions.is_empty() => Self {
                phase: Phase::Unavailable {
                    reason: format!("Not enough distinct {} groups for a quiz.", self.level),
                },
                ..self
            },
            (Phase::Loading, Event::Loaded(questions)) => Self {
                questions,
                phase: Phase::Ready,
                ..self
            },
            (Phase::Loading, Event::LoadFailed(reason)) => Self {
                phase: Phase::Unavailable { reason },
                ..self
            },
            (Phase::Ready, Event::Start) => Self {
                phase: Phase::Asking { index: 0 },
                ..self
            },
            (Phase::Asking { index }, Event::Answer(choice)) => {
                let correct = self
                    .questions
                    .get(index)
                    .is_some_and(|q| q.option_is_correct(choice));
                Self {
                    score: self.score + usize::from(correct),
                    phase: Phase::Answered {
                        index,
                        chosen: Some(choice),
                        correct,
                    },
                    ..self
                }
            }
            (Phase::Asking { index }, Event::Skip) => Self {
                phase: Phase::Answered {
                    index,
                    chosen: None,
                    correct: false,
                },
                ..self
            },
            (Phase::Answered { index, .. }, Event::Next) if index + 1 < self.questions.len() => {
                Self {
                    phase: Phase::Asking { index: index + 1 },
                    ..self
                }
            }
            (Phase::Answered { .. }, Event::Next) => Self {
                phase: Phase::Finished,
                ..self
            },
            (Phase::Ready | Phase::Asking { .. } | Phase::Answered { .. }, Event::Quit) => Self {
                phase: Phase::Finished,
                ..self
            },
            _ => self,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }
    pub fn phase(&self) -> &Phase {
        &self.phase
    }
    pub fn score(&self) -> usize {
        self.score
    }
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        match self.phase {
            Phase::Asking { index } | Phase::Answered { index, .. } => self.questions.get(index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;
    use crate::quiz::{build_questions, QuizSettings};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn questions(count: usize) -> Vec<Question> {
        let observations: Vec<Observation> = (0..6)
            .map(|i| Observation::new(i, format!("Genus{i} species"), "url", "cc0"))
            .collect();
        let settings = QuizSettings {
            question_count: count,
            ..QuizSettings::default()
        };
        build_questions(
            &mut StdRng::seed_from_u64(11),
            &observations,
            Level::Species,
            settings,
        )
    }

    fn ready(count: usize) -> QuizState {
        QuizState::new(Level::Species).apply(Event::Loaded(questions(count)))
    }

    #[test]
    fn runs_through_every_question_to_the_end() {
        let mut state = ready(2).apply(Event::Start);
        assert_eq!(state.phase(), &Phase::Asking { index: 0 });

        let right = state.current_question().unwrap().correct_index().unwrap();
        state = state.apply(Event::Answer(right));
        assert_eq!(
            state.phase(),
            &Phase::Answered {
                index: 0,
                chosen: Some(right),
                correct: true
            }
        );
        state = state.apply(Event::Next);
        assert_eq!(state.phase(), &Phase::Asking { index: 1 });

        let wrong = (right + 1) % 4;
        let wrong = if state.current_question().unwrap().option_is_correct(wrong) {
            (wrong + 1) % 4
        } else {
            wrong
        };
        state = state.apply(Event::Answer(wrong)).apply(Event::Next);
        assert_eq!(state.phase(), &Phase::Finished);
        assert_eq!(state.score(), 1);
    }

    #[test]
    fn skipping_scores_nothing() {
        let state = ready(1).apply(Event::Start).apply(Event::Skip);
        assert!(matches!(
            state.phase(),
            Phase::Answered {
                chosen: None,
                correct: false,
                ..
            }
        ));
        assert_eq!(state.score(), 0);
    }

    #[test]
    fn empty_or_failed_loads_are_unavailable() {
        let empty = QuizState::new(Level::Family).apply(Event::Loaded(Vec::new()));
        assert!(matches!(empty.phase(), Phase::Unavailable { reason } if reason.contains("family")));

        let failed = QuizState::new(Level::Genus).apply(Event::LoadFailed("offline".into()));
        assert_eq!(
            failed.phase(),
            &Phase::Unavailable {
                reason: "offline".into()
            }
        );
    }

    #[test]
    fn selecting_a_level_restarts_loading() {
        let state = ready(2)
            .apply(Event::Start)
            .apply(Event::Skip)
            .apply(Event::SelectLevel(Level::Genus));
        assert_eq!(state.phase(), &Phase::Loading);
        assert_eq!(state.level(), Level::Genus);
        assert_eq!(state.total(), 0);
    }

    #[test]
    fn out_of_phase_events_are_ignored() {
        let state = ready(2);
        assert_eq!(state.clone().apply(Event::Next), state);
        assert_eq!(state.clone().apply(Event::Answer(0)), state);
        assert_eq!(state.clone().apply(Event::Quit).phase(), &Phase::Finished);
    }
}
