//! Skill-domain session state.
//!
//! Tracks the active domain and the one before it. The previous domain stays
//! unset until the first explicit switch, so neither the initial render nor
//! that first switch produces a persona announcement.

use crate::domain::SkillDomain;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    current: SkillDomain,
    last: Option<SkillDomain>,
}

impl SessionState {
    pub fn new(initial: SkillDomain) -> Self {
        Self {
            current: initial,
            last: None,
        }
    }

    pub fn current(&self) -> SkillDomain {
        self.current
    }

    pub fn last(&self) -> Option<SkillDomain> {
        self.last
    }

    /// Switch to `domain`, returning the persona announcement to show, if any.
    ///
    /// Re-selecting the active domain is a no-op.
    pub fn select_domain(&mut self, domain: SkillDomain) -> Option<&'static str> {
        if domain == self.current {
            return None;
        }

        let had_previous = self.last.is_some();
        self.last = Some(self.current);
        self.current = domain;
        debug!("Skill domain {:?} -> {}", self.last, self.current);

        had_previous.then(|| domain.persona_message())
    }
}
