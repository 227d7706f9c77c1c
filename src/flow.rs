//! Client-side confirmation flow.
//!
//! Models the two-step join a client drives: redeem a code to preview the
//! partner, then explicitly confirm. The held `PendingMatch` lives in
//! session-scoped state only; if the session ends before confirmation the
//! attempt simply lapses, because redeem performed no mutation on the
//! server. The snapshot carries no authority: confirm re-validates the code
//! server-side, and a stale snapshot just means the confirm call fails.

use crate::models::space::PendingMatch;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmFlow {
    /// No pairing attempt in progress; the code-entry screen.
    Idle,
    /// A code resolved and the partner preview ("Is this your partner?")
    /// is being shown.
    Previewing(PendingMatch),
    /// Confirm committed; show the one-time celebration, then steady state.
    Paired { space_id: String },
}

impl ConfirmFlow {
    pub fn new() -> Self {
        ConfirmFlow::Idle
    }

    /// A redeem call succeeded; hold the snapshot for the preview screen.
    /// Redeeming again simply replaces the previous snapshot.
    pub fn redeemed(&mut self, pending: PendingMatch) {
        *self = ConfirmFlow::Previewing(pending);
    }

    /// The code the user would be confirming, if a preview is active.
    pub fn pending(&self) -> Option<&PendingMatch> {
        match self {
            ConfirmFlow::Previewing(p) => Some(p),
            _ => None,
        }
    }

    /// Confirm committed server-side.
    pub fn confirmed(&mut self, space_id: String) {
        *self = ConfirmFlow::Paired { space_id };
    }

    /// Confirm failed because the code became invalid between redeem and
    /// confirm. The snapshot is cleared and the user returns to code entry;
    /// the caller shows a generic, non-technical message.
    pub fn confirm_failed(&mut self) -> &'static str {
        *self = ConfirmFlow::Idle;
        "this connection is no longer available"
    }

    /// User navigated away from the preview without confirming. No server
    /// cleanup is needed.
    pub fn dismissed(&mut self) {
        if matches!(self, ConfirmFlow::Previewing(_)) {
            *self = ConfirmFlow::Idle;
        }
    }
}

impl Default for ConfirmFlow {
    fn default() -> Self {
        Self::new()
    }
}
