//! Per-attempt swap state machine.

use std::fmt;

/// Progress of a single swap attempt.
///
/// `Idle → QuoteFetched → Signed → Assembled → Broadcast → Confirmed`, with
/// `Failed` reachable from every non-terminal state. There is no way back to
/// `Idle`; a retry is a new attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SwapState {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// A quote was received and validated.
    QuoteFetched,
    /// The Permit2 payload was signed.
    Signed,
    /// The signature was spliced into the calldata.
    Assembled,
    /// The transaction was submitted.
    Broadcast,
    /// The transaction was mined successfully.
    Confirmed,
    /// The attempt stopped with an error.
    Failed,
}

impl SwapState {
    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Confirmed | Self::Failed)
    }

    /// The state a successful step leads to.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Idle => Some(Self::QuoteFetched),
            Self::QuoteFetched => Some(Self::Signed),
            Self::Signed => Some(Self::Assembled),
            Self::Assembled => Some(Self::Broadcast),
            Self::Broadcast => Some(Self::Confirmed),
            Self::Confirmed | Self::Failed => None,
        }
    }

    /// Whether `self → to` is a legal transition.
    #[must_use]
    pub fn can_advance_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }
}

impl fmt::Display for SwapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::QuoteFetched => "quote_fetched",
            Self::Signed => "signed",
            Self::Assembled => "assembled",
            Self::Broadcast => "broadcast",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
