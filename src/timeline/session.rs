//! Per-session state of the pagination controller.

/// Where the controller is in a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Building,
    Fetching,
    Applying,
}

/// What started a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A session was (re)initialized.
    Activate,
    /// Scroll reached the bottom of the materialized window.
    Append,
    /// New data arrived from outside; reread what we have.
    Requery,
    /// Returning from suspension.
    Resume,
}

impl Trigger {
    pub fn is_appending(self) -> bool {
        self == Self::Append
    }

    pub fn is_requery(self) -> bool {
        self == Self::Requery
    }
}

/// Last scroll position reported by the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub first_visible: usize,
    pub visible_count: usize,
}

/// Mutable flags of one session, read and written only by the controller.
#[derive(Debug, Default)]
pub struct SessionState {
    pub phase: Phase,
    /// Bumped on every BUILDING entry and on invalidation; results carrying
    /// an older value are discarded.
    pub generation: u64,
    /// The last appending fetch did not grow the window.
    pub no_more_items: bool,
    /// A position was restored (or the fallback applied) this session.
    pub position_restored: bool,
    pub suspended: bool,
    /// Torn down; nothing may mutate the window any more.
    pub finishing: bool,
    /// Loading indicator state last sent to the surface.
    pub loading: bool,
    /// A remote sync was requested and has not reported back.
    pub sync_pending: bool,
    pub viewport: Viewport,
    /// Trigger that arrived while a fetch was in flight.
    pub queued: Option<Trigger>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fetch_in_flight(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Start a new generation, superseding any in-flight cycle.
    pub fn next_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        !self.finishing && generation == self.generation
    }

    /// Remember a trigger for when the in-flight cycle completes.
    /// A full cycle outranks a requery, which outranks an append.
    pub fn queue(&mut self, trigger: Trigger) {
        let rank = |t: Trigger| match t {
            Trigger::Append => 0,
            Trigger::Requery => 1,
            _ => 2,
        };
        match self.queued {
            Some(queued) if rank(queued) >= rank(trigger) => {}
            _ => self.queued = Some(trigger),
        }
    }
}
