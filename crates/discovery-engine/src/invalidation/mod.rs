//! Pipeline invalidation engine
//!
//! Pipeline sections are ordered chains of steps. Each step owns some
//! answer fields and one completion timestamp. Editing a step makes every
//! later step stale, so [`PipelineChain::invalidate_from`] resets them and
//! clears the section's terminal markers (derived summary, completion
//! stamp).
//!
//! One generic engine serves every pipeline section. A section plugs in by
//! implementing [`PipelineSection`] and publishing a static chain of
//! [`StepDescriptor`]s.
//!
//! ## Ordering law
//!
//! If step *i* is complete then every step before *i* is complete. All
//! operations here preserve it; [`PipelineChain::normalize`] restores it
//! after a raw patch.

mod chains;

pub use chains::{FINANCIAL_GOALS_CHAIN, VALUES_DISCOVERY_CHAIN};

use crate::error::InvalidationError;
use discovery_model::{DiscoveryState, Profile, SectionName, Timestamp};

/// One step of a pipeline section
pub struct StepDescriptor<S> {
    /// Stable step token
    pub token: &'static str,
    /// Read the step's completion stamp
    pub completed_at: fn(&S) -> Option<Timestamp>,
    /// Write the step's completion stamp
    pub set_completed_at: fn(&mut S, Option<Timestamp>),
    /// Whether the step holds any answers
    pub has_answers: fn(&S) -> bool,
    /// Clear the answer fields the step owns
    pub clear_answers: fn(&mut S),
}

impl<S> StepDescriptor<S> {
    /// Check if the step carries a completion stamp
    #[inline]
    pub fn is_complete(&self, section: &S) -> bool {
        (self.completed_at)(section).is_some()
    }

    /// Clear answers and completion stamp
    pub fn reset(&self, section: &mut S) {
        (self.clear_answers)(section);
        (self.set_completed_at)(section, None);
    }
}

impl<S> std::fmt::Debug for StepDescriptor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// A section with an ordered step pipeline
pub trait PipelineSection: Clone + 'static {
    /// The section's dependency chain
    fn chain() -> &'static PipelineChain<Self>;
    /// Coarse section state
    fn state(&self) -> DiscoveryState;
    /// Set the coarse section state
    fn set_state(&mut self, state: DiscoveryState);
    /// When the section was first touched
    fn started_at(&self) -> Option<Timestamp>;
    /// Stamp the first touch
    fn set_started_at(&mut self, at: Timestamp);
    /// Whether a derived summary or completion stamp is present
    fn has_terminal_markers(&self) -> bool;
    /// Drop the derived summary and completion stamp
    fn clear_terminal_markers(&mut self);
    /// Stamp section completion
    fn set_completed_at(&mut self, at: Timestamp);
}

/// Result of an invalidation: the new section value and the steps reset
#[derive(Debug, Clone, PartialEq)]
pub struct Invalidation<S> {
    /// Section after the operation
    pub section: S,
    /// Tokens of steps whose answers were cleared, in pipeline order
    pub reset_steps: Vec<&'static str>,
}

/// Static per-section dependency chain
#[derive(Debug)]
pub struct PipelineChain<S: 'static> {
    pub(crate) section: SectionName,
    pub(crate) steps: &'static [StepDescriptor<S>],
}

impl<S: PipelineSection> PipelineChain<S> {
    /// Section this chain belongs to
    #[inline]
    #[must_use]
    pub fn section(&self) -> SectionName {
        self.section
    }

    /// Step tokens in order
    #[must_use]
    pub fn tokens(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.token).collect()
    }

    /// Step index for a token
    ///
    /// # Errors
    /// [`InvalidationError::UnknownStep`] for a token outside the chain
    pub fn position(&self, token: &str) -> Result<usize, InvalidationError> {
        self.steps
            .iter()
            .position(|step| step.token == token)
            .ok_or_else(|| {
                report(InvalidationError::UnknownStep {
                    section: self.section,
                    token: token.to_string(),
                })
            })
    }

    /// Whether anything in the section has been answered or started
    #[must_use]
    pub fn is_touched(&self, section: &S) -> bool {
        section.started_at().is_some()
            || self
                .steps
                .iter()
                .any(|step| step.is_complete(section) || (step.has_answers)(section))
    }

    /// Mark a touched section in progress and stamp its first touch
    ///
    /// An untouched section is returned as-is; a complete one stays complete.
    #[must_use]
    pub fn start(&self, section: &S, at: Timestamp) -> S {
        let mut next = section.clone();
        if self.is_touched(section) {
            start(&mut next, at);
        }
        next
    }

    /// Reset every step after `token` and clear terminal markers
    ///
    /// Answers of `token` itself and of earlier steps are kept. Changing the
    /// last step resets nothing but still clears the terminal markers. A
    /// touched section ends up in progress; an untouched one stays not
    /// started.
    ///
    /// # Errors
    /// [`InvalidationError::UnknownStep`] for a token outside the chain
    pub fn invalidate_from(
        &self,
        section: &S,
        token: &str,
    ) -> Result<Invalidation<S>, InvalidationError> {
        let index = self.position(token)?;
        let mut next = section.clone();
        let reset_steps = self.steps[index + 1..]
            .iter()
            .map(|step| {
                step.reset(&mut next);
                step.token
            })
            .collect();
        reopen(&mut next);
        Ok(Invalidation {
            section: next,
            reset_steps,
        })
    }

    /// Reset every step; `started_at` and section-level data survive
    #[must_use]
    pub fn reset_all(&self, section: &S) -> Invalidation<S> {
        let mut next = section.clone();
        for step in self.steps {
            step.reset(&mut next);
        }
        next.clear_terminal_markers();
        next.set_state(DiscoveryState::NotStarted);
        Invalidation {
            section: next,
            reset_steps: self.tokens(),
        }
    }

    /// Stamp one step complete
    ///
    /// Later steps are left alone; callers that changed the step's answers
    /// follow up with [`invalidate_from`](Self::invalidate_from).
    ///
    /// # Errors
    /// - [`InvalidationError::UnknownStep`] for a token outside the chain
    /// - [`InvalidationError::UpstreamIncomplete`] when an earlier step is open
    pub fn complete_step(
        &self,
        section: &S,
        token: &str,
        at: Timestamp,
    ) -> Result<S, InvalidationError> {
        let index = self.position(token)?;
        let step = &self.steps[index];
        if let Some(missing) = self.steps[..index]
            .iter()
            .find(|upstream| !upstream.is_complete(section))
        {
            return Err(InvalidationError::UpstreamIncomplete {
                section: self.section,
                step: step.token,
                missing: missing.token,
            });
        }

        let mut next = section.clone();
        (step.set_completed_at)(&mut next, Some(at));
        start(&mut next, at);
        Ok(next)
    }

    /// Mark the whole section complete
    ///
    /// # Errors
    /// [`InvalidationError::UpstreamIncomplete`] naming the first open step
    pub fn complete_section(&self, section: &S, at: Timestamp) -> Result<S, InvalidationError> {
        if let Some(missing) = self.steps.iter().find(|step| !step.is_complete(section)) {
            return Err(InvalidationError::UpstreamIncomplete {
                section: self.section,
                step: "section",
                missing: missing.token,
            });
        }
        let mut next = section.clone();
        start(&mut next, at);
        next.set_state(DiscoveryState::Complete);
        next.set_completed_at(at);
        Ok(next)
    }

    /// Check the ordering law
    ///
    /// # Errors
    /// [`InvalidationError::OrderingViolation`] for the first completed step
    /// found after an open one
    pub fn check_ordering(&self, section: &S) -> Result<(), InvalidationError> {
        let Some(gap) = self.steps.iter().position(|step| !step.is_complete(section)) else {
            return Ok(());
        };
        match self.steps[gap + 1..]
            .iter()
            .find(|step| step.is_complete(section))
        {
            Some(step) => Err(InvalidationError::OrderingViolation {
                section: self.section,
                step: step.token,
                missing: self.steps[gap].token,
            }),
            None => Ok(()),
        }
    }

    /// Restore the ordering law after a raw write
    ///
    /// Completed steps after the first open step are reset. A section with
    /// an open step cannot carry terminal markers, so those are cleared too.
    #[must_use]
    pub fn normalize(&self, section: &S) -> Invalidation<S> {
        let mut next = section.clone();
        let mut reset_steps = Vec::new();
        if let Some(gap) = self.steps.iter().position(|step| !step.is_complete(section)) {
            for step in &self.steps[gap + 1..] {
                if step.is_complete(&next) {
                    step.reset(&mut next);
                    reset_steps.push(step.token);
                }
            }
            if next.has_terminal_markers() || next.state() == DiscoveryState::Complete {
                reopen(&mut next);
            }
        }
        Invalidation {
            section: next,
            reset_steps,
        }
    }
}

/// A pipeline operation addressed by section name
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineOp<'a> {
    /// [`PipelineChain::invalidate_from`]
    InvalidateFrom(&'a str),
    /// [`PipelineChain::complete_step`]
    CompleteStep(&'a str, Timestamp),
    /// [`PipelineChain::complete_section`]
    CompleteSection(Timestamp),
    /// [`PipelineChain::reset_all`]
    ResetAll,
    /// [`PipelineChain::normalize`]
    Normalize,
    /// [`PipelineChain::start`]
    Start(Timestamp),
}

impl PipelineOp<'_> {
    /// Apply to the named section of a profile, returning the reset steps
    ///
    /// The profile is untouched on error.
    ///
    /// # Errors
    /// [`InvalidationError::NoPipeline`] for a section without steps, or
    /// whatever the chain operation returns
    pub fn apply(
        self,
        profile: &mut Profile,
        section: SectionName,
    ) -> Result<Vec<&'static str>, InvalidationError> {
        match section {
            SectionName::ValuesDiscovery => self.run(&mut profile.values_discovery),
            SectionName::FinancialGoals => self.run(&mut profile.financial_goals),
            other => Err(report(InvalidationError::NoPipeline(other))),
        }
    }

    fn run<S: PipelineSection>(self, slot: &mut S) -> Result<Vec<&'static str>, InvalidationError> {
        let chain = S::chain();
        let outcome = match self {
            Self::InvalidateFrom(token) => chain.invalidate_from(slot, token)?,
            Self::CompleteStep(token, at) => Invalidation {
                section: chain.complete_step(slot, token, at)?,
                reset_steps: Vec::new(),
            },
            Self::CompleteSection(at) => Invalidation {
                section: chain.complete_section(slot, at)?,
                reset_steps: Vec::new(),
            },
            Self::ResetAll => chain.reset_all(slot),
            Self::Normalize => chain.normalize(slot),
            Self::Start(at) => Invalidation {
                section: chain.start(slot, at),
                reset_steps: Vec::new(),
            },
        };
        *slot = outcome.section;
        Ok(outcome.reset_steps)
    }
}

fn start<S: PipelineSection>(section: &mut S, at: Timestamp) {
    if section.started_at().is_none() {
        section.set_started_at(at);
    }
    if section.state() == DiscoveryState::NotStarted {
        section.set_state(DiscoveryState::InProgress);
    }
}

fn reopen<S: PipelineSection>(section: &mut S) {
    section.clear_terminal_markers();
    if section.state() == DiscoveryState::Complete || S::chain().is_touched(section) {
        section.set_state(DiscoveryState::InProgress);
    }
}

/// Log a programmer error; panic under `strict-debug`
fn report(err: InvalidationError) -> InvalidationError {
    tracing::error!(error = %err, "pipeline dependency table misuse");

    #[cfg(feature = "strict-debug")]
    panic!("{err}");

    #[cfg(not(feature = "strict-debug"))]
    err
}

#[cfg(test)]
mod tests;
