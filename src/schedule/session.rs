//! Training session bookkeeping
//!
//! Tracks the current question (wrong attempts and answer timer) and the
//! progress of the whole session.

use std::time::{Duration, Instant};

use shakmaty::Move;

use crate::error::Result;
use crate::repertoire::{Repertoire, Section};
use crate::schedule::sm2::{Quality, SchedulerTriple};
use crate::visitor::Visit;

/// Outcome of one answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    /// The expected move; carries the new schedule if the record was found
    Correct(Option<SchedulerTriple>),
    /// Another move stored for the same position; no penalty, question stays open
    Alternative,
    /// Not a repertoire move; counts against the current question
    Incorrect,
}

#[derive(Debug, Clone)]
pub struct TrainingSession {
    /// Questions answered correctly on the first try
    correct: u32,

    /// Questions completed
    answered: u32,

    /// Wrong attempts at the current question
    incorrect_answers: u32,

    /// When the current question was asked
    started: Instant,
}

impl Default for TrainingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingSession {
    pub fn new() -> Self {
        Self {
            correct: 0,
            answered: 0,
            incorrect_answers: 0,
            started: Instant::now(),
        }
    }

    /// Start timing a new question.
    pub fn reset_question(&mut self) {
        self.incorrect_answers = 0;
        self.started = Instant::now();
    }

    pub fn incorrect_answer(&mut self) {
        self.incorrect_answers += 1;
    }

    pub fn incorrect_answers(&self) -> u32 {
        self.incorrect_answers
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn quality(&self) -> Quality {
        Quality::from_attempt(self.incorrect_answers, self.elapsed())
    }

    /// (first-try correct, completed) for the session.
    pub fn progress(&self) -> (u32, u32) {
        (self.correct, self.answered)
    }

    fn complete_question(&mut self) {
        if self.incorrect_answers == 0 {
            self.correct += 1;
        }
        self.answered += 1;
        self.reset_question();
    }

    /// Judge `played` against the move expected at `visit`.
    ///
    /// A correct answer writes the graded schedule to the repertoire and
    /// starts the next question. Nothing is flushed.
    pub fn answer(&mut self, rep: &mut Repertoire, section: Section, visit: &Visit, played: &Move) -> Result<Answer> {
        if *played == visit.mv {
            let triple = rep.update_learning_data(
                section,
                &visit.position,
                &visit.mv,
                self.incorrect_answers,
                self.elapsed(),
            )?;
            self.complete_question();
            return Ok(Answer::Correct(triple));
        }
        if rep.contains(section, &visit.position, played) {
            return Ok(Answer::Alternative);
        }
        self.incorrect_answer();
        Ok(Answer::Incorrect)
    }
}
