//! Confirmation capability for verbs that ask before acting (`rm -i`).

use crate::config::ConfirmPolicy;

/// Answers a yes/no question on behalf of the user.
///
/// Implementations must not block indefinitely: a caller without a prompt
/// channel supplies a [`FixedAnswer`].
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Answers every prompt the same way without asking anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

impl From<ConfirmPolicy> for FixedAnswer {
    fn from(policy: ConfirmPolicy) -> Self {
        FixedAnswer(matches!(policy, ConfirmPolicy::Accept))
    }
}

/// Interprets a typed reply. Only `y`/`Y` counts as yes.
pub fn is_affirmative(reply: &str) -> bool {
    reply.trim().eq_ignore_ascii_case("y")
}
