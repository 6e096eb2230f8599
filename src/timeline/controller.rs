//! Pagination controller: owns one timeline session.
//!
//! Every state transition happens on the task that owns the controller.
//! Store queries run on the fetch actor; their results come back as
//! [`FetchEvent`]s that the owner feeds in through [`TimelineController::process_fetch_events`]
//! or [`TimelineController::wait_for_fetch`].

use anyhow::{Context, Result};
use std::sync::Arc;

use super::loader::{ScrollEvent, should_load_more};
use super::params::row_limit;
use super::session::{Phase, SessionState, Trigger, Viewport};
use super::surface::{OpenRequest, ScrollTarget, SyncRequest, TimelineSurface};
use super::worker::{FetchActorHandle, FetchCommand, FetchEvent, spawn_fetch_actor};
use super::{EntityId, ListParameters, Record, SelectionBuilder, SelectionKey, TimelineCategory};
use crate::error::StoreResult;
use crate::position::{PositionLookup, PositionStore};
use crate::store::{FetchOutcome, TimelineBackend};

/// What the user asked to see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineRequest {
    pub category: TimelineCategory,
    pub combined: bool,
    pub account_id: EntityId,
    /// User whose timeline is shown, 0 for none.
    pub selected_entity_id: EntityId,
    pub search_query: String,
    /// Also search on the remote service.
    pub global_search: bool,
}

impl TimelineRequest {
    pub fn new(category: TimelineCategory, account_id: EntityId) -> Self {
        Self {
            category,
            account_id,
            ..Self::default()
        }
    }

    /// Fill in what an incomplete request implies.
    pub fn normalized(mut self) -> Self {
        self.search_query = self.search_query.trim().to_string();
        if self.category.is_unknown() {
            self.category = TimelineCategory::Home;
            self.search_query.clear();
            self.selected_entity_id = 0;
        }
        if self.category.requires_selected_entity() && self.selected_entity_id == 0 {
            self.selected_entity_id = self.account_id;
        }
        self
    }
}

pub struct TimelineController<B: TimelineBackend, V: TimelineSurface> {
    backend: Arc<B>,
    positions: PositionStore<B>,
    selections: SelectionBuilder,
    state: SessionState,
    request: Option<TimelineRequest>,
    /// Name of the requested account, resolved on activation.
    account_name: Option<String>,
    /// Parameters of the cycle that produced `records`.
    params: Option<ListParameters>,
    /// Account name `params` were built with.
    applied_account_name: Option<String>,
    records: Vec<Record>,
    worker: FetchActorHandle,
    surface: V,
    page_size: usize,
}

impl<B: TimelineBackend, V: TimelineSurface> TimelineController<B, V> {
    /// Create a controller and spawn its fetch actor. Must run inside a tokio runtime.
    pub fn new(backend: Arc<B>, surface: V, page_size: usize) -> Self {
        let worker = spawn_fetch_actor(Arc::clone(&backend));
        Self {
            positions: PositionStore::new(Arc::clone(&backend)),
            backend,
            selections: SelectionBuilder::new(),
            state: SessionState::new(),
            request: None,
            account_name: None,
            params: None,
            applied_account_name: None,
            records: Vec::new(),
            worker,
            surface,
            page_size: page_size.max(1),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn params(&self) -> Option<&ListParameters> {
        self.params.as_ref()
    }

    pub fn request(&self) -> Option<&TimelineRequest> {
        self.request.as_ref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn surface(&self) -> &V {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut V {
        &mut self.surface
    }

    pub fn no_more_items(&self) -> bool {
        self.state.no_more_items
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    //
    // Operations
    //

    /// (Re)initialize the session with a timeline and start loading it.
    pub async fn activate(&mut self, request: TimelineRequest) -> Result<()> {
        if self.state.finishing {
            return Ok(());
        }
        let request = request.normalized();
        tracing::info!(
            "Activate {} account={} user={} combined={} query={:?}",
            request.category,
            request.account_id,
            request.selected_entity_id,
            request.combined,
            request.search_query
        );

        self.account_name = self
            .backend
            .account_name(request.account_id)
            .await
            .context("Failed to resolve account name")?;
        self.state.position_restored = false;
        self.state.suspended = false;
        // Account scopes may have changed since the last activation
        self.selections.invalidate();

        if request.global_search && !request.search_query.is_empty() {
            let account = if request.combined {
                None
            } else {
                self.account_name.clone()
            };
            self.state.sync_pending = true;
            self.set_loading(true);
            self.surface.request_sync(SyncRequest::Search {
                account,
                query: request.search_query.clone(),
            });
        }

        self.request = Some(request);
        self.start_fetch(Trigger::Activate).await;
        Ok(())
    }

    /// Ask the remote service for fresh data of `category`.
    /// `force_all` also requests every other timeline of the account.
    pub async fn request_reload(&mut self, category: TimelineCategory, force_all: bool) -> Result<()> {
        let Some(request) = self.request.clone() else {
            tracing::debug!("Reload ignored: no active timeline");
            return Ok(());
        };
        if self.state.finishing {
            return Ok(());
        }

        let (sync_category, user_id) = match category {
            TimelineCategory::Direct | TimelineCategory::Mentions | TimelineCategory::Public => {
                (category, 0)
            }
            TimelineCategory::User | TimelineCategory::FollowingUser => {
                (category, request.selected_entity_id)
            }
            _ => (TimelineCategory::Home, 0),
        };

        let mut all_accounts = request.combined;
        let mut account_id = if self.backend.is_own_account(request.account_id).await? {
            Some(request.account_id)
        } else {
            None
        };
        if user_id != 0 {
            all_accounts = false;
            account_id = self
                .backend
                .account_for_user(user_id, request.account_id)
                .await?;
        }

        let account_name = match account_id {
            Some(id) => self.backend.account_name(id).await?,
            None => None,
        };
        if !all_accounts && account_name.is_none() {
            tracing::warn!(
                "Reload of {} dropped: no account for user {}",
                sync_category,
                user_id
            );
            return Ok(());
        }

        let all_timelines = force_all && account_name.is_some();
        tracing::info!(
            "Requesting sync of {} for {} all_timelines={}",
            sync_category,
            account_name.as_deref().unwrap_or("all accounts"),
            all_timelines
        );
        self.state.sync_pending = true;
        self.set_loading(true);
        self.surface.request_sync(SyncRequest::FetchTimeline {
            account: if all_accounts { None } else { account_name },
            category: sync_category,
            user_id,
            all_timelines,
        });
        Ok(())
    }

    /// Background synchronization delivered records for `category`.
    pub async fn on_external_data_arrived(&mut self, category: TimelineCategory) {
        self.state.sync_pending = false;
        self.set_loading(false);

        let Some(displayed) = self.request.as_ref().map(|r| r.category) else {
            return;
        };
        if category == displayed || category == TimelineCategory::All {
            tracing::debug!("New data for {}, requerying", category);
            self.start_fetch(Trigger::Requery).await;
        }
    }

    /// Scroll position changed; may load the next page.
    pub async fn on_scroll(&mut self, event: ScrollEvent) {
        self.state.viewport = Viewport {
            first_visible: event.first_visible_index,
            visible_count: event.visible_count,
        };
        if should_load_more(&self.state, &event) {
            tracing::debug!(
                "Scrolled to bottom ({}+{} of {}), loading one more page",
                event.first_visible_index,
                event.visible_count,
                event.total_count
            );
            self.start_fetch(Trigger::Append).await;
        }
    }

    /// The user tapped the record at `index`.
    pub async fn on_item_tapped(&mut self, index: usize) -> Result<()> {
        let Some(record) = self.records.get(index) else {
            return Ok(());
        };
        if record.id <= 0 {
            return Ok(());
        }
        let Some(request) = self.request.as_ref() else {
            return Ok(());
        };

        let linked = record.linked_account_id;
        let account_id = if linked != 0 && self.backend.is_own_account(linked).await? {
            linked
        } else {
            request.account_id
        };
        self.surface.open_record(OpenRequest {
            record_id: record.id,
            account_id,
            category: request.category,
        });
        Ok(())
    }

    /// Pause: keep the parameters, drop anything in flight.
    pub async fn suspend(&mut self) {
        if self.state.position_restored && !self.state.loading {
            self.save_position().await;
        }
        self.state.position_restored = false;
        self.state.suspended = true;
        self.state.next_generation();
        tracing::debug!("Suspended at generation {}", self.state.generation);
    }

    pub async fn resume(&mut self) {
        if !self.state.suspended {
            return;
        }
        self.state.suspended = false;
        if self.request.is_none() {
            return;
        }
        // Whatever arrived while paused runs now, unless a full cycle covers it
        self.state.queue(Trigger::Resume);
        if let Some(trigger) = self.state.queued.take() {
            self.start_fetch(trigger).await;
        }
    }

    /// Tear down. Nothing touches the window afterwards.
    pub async fn shutdown(&mut self) {
        if self.state.finishing {
            return;
        }
        if self.state.position_restored {
            self.save_position().await;
        }
        self.state.finishing = true;
        self.state.queued = None;
        self.state.next_generation();
        if self.worker.cmd_tx.send(FetchCommand::Shutdown).await.is_err() {
            tracing::debug!("Fetch actor already gone");
        }
        tracing::info!("Timeline controller shut down");
    }

    /// Count every record the current timeline could show.
    pub async fn count_available(&self) -> StoreResult<usize> {
        match &self.params {
            Some(params) => {
                self.backend
                    .count(&params.selection, &params.search_query)
                    .await
            }
            None => Ok(0),
        }
    }

    //
    // Fetch events
    //

    /// Apply fetch results that already arrived without waiting. Returns how many.
    pub async fn process_fetch_events(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.worker.event_rx.try_recv() {
            self.handle_fetch_event(event).await;
            processed += 1;
        }
        processed
    }

    /// Wait for the in-flight fetch, if any, and apply it.
    pub async fn wait_for_fetch(&mut self) {
        if !self.state.is_fetch_in_flight() {
            return;
        }
        match self.worker.event_rx.recv().await {
            Some(event) => self.handle_fetch_event(event).await,
            None => {
                tracing::warn!("Fetch actor stopped with a fetch in flight");
                self.state.phase = Phase::Idle;
                self.state.queued = None;
                self.set_loading(false);
            }
        }
    }

    /// Wait until no fetch is in flight, including chained ones.
    pub async fn settle(&mut self) {
        while self.state.is_fetch_in_flight() {
            self.wait_for_fetch().await;
        }
    }

    //
    // State machine
    //

    async fn start_fetch(&mut self, trigger: Trigger) {
        if self.state.finishing || self.request.is_none() {
            return;
        }
        if self.state.is_fetch_in_flight() {
            if trigger.is_appending() {
                tracing::debug!("Append ignored: fetch in flight");
                return;
            }
            let superseded = self.state.generation;
            self.state.next_generation();
            self.state.queue(trigger);
            tracing::debug!("Generation {} superseded by {:?}", superseded, trigger);
            return;
        }
        if self.state.suspended {
            if !trigger.is_appending() {
                tracing::debug!("{:?} deferred until resume", trigger);
                self.state.queue(trigger);
            }
            if !self.state.sync_pending {
                self.set_loading(false);
            }
            return;
        }

        if !trigger.is_appending() {
            self.state.no_more_items = false;
        }
        self.state.phase = Phase::Building;
        let generation = self.state.next_generation();

        let params = match self.build_params(trigger, generation).await {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!("Failed to prepare timeline query: {:#}", e);
                self.state.phase = Phase::Idle;
                self.set_loading(false);
                return;
            }
        };

        if params.has_search()
            && let Err(e) = self.backend.save_recent_query(&params.search_query).await
        {
            tracing::warn!("Failed to remember search query: {}", e);
        }

        tracing::debug!(
            "Fetch {:?} generation={} {} limit={} resume_from={} appending={} requery={}",
            trigger,
            generation,
            params.category,
            params.row_limit,
            params.resume_from_id,
            params.appending,
            params.requery
        );
        let command = FetchCommand::Fetch {
            params: Box::new(params),
        };
        if self.worker.cmd_tx.send(command).await.is_err() {
            tracing::warn!("Fetch actor is gone, timeline not loaded");
            self.state.phase = Phase::Idle;
            self.set_loading(false);
            return;
        }
        self.state.phase = Phase::Fetching;
        self.set_loading(true);
    }

    async fn build_params(&mut self, trigger: Trigger, generation: u64) -> Result<ListParameters> {
        let request = self
            .request
            .clone()
            .context("No timeline requested")?;

        let appending = trigger.is_appending() && self.params.is_some();
        let key = SelectionKey {
            category: request.category,
            combined: request.combined,
            acting_account_id: request.account_id,
            selected_entity_id: request.selected_entity_id,
        };
        let selection = self.selections.selection(key, &*self.backend).await?;

        let mut params = ListParameters {
            category: request.category,
            combined: request.combined,
            acting_account_id: request.account_id,
            selected_entity_id: request.selected_entity_id,
            search_query: request.search_query,
            selection,
            row_limit: row_limit(self.records.len(), appending, self.page_size),
            resume_from_id: 0,
            appending,
            incremental_session: self.state.position_restored && appending,
            requery: trigger.is_requery(),
            generation,
            reload_hint: TimelineCategory::Unknown,
        };

        // A cold session must read at least through the saved read-ahead record
        if !self.state.position_restored {
            let key = params.position_key(self.account_name.as_deref());
            let lookup = self
                .positions
                .load_read_ahead(&key, &params.search_query)
                .await?;
            params.resume_from_id = lookup.id().unwrap_or(0);
        }
        Ok(params)
    }

    async fn handle_fetch_event(&mut self, event: FetchEvent) {
        let generation = event.params().generation;
        if !self.state.is_current(generation) {
            tracing::debug!(
                "Discarding result of generation {} (current {})",
                generation,
                self.state.generation
            );
            self.state.phase = Phase::Idle;
            if self.state.finishing {
                return;
            }
            match self.state.queued.take() {
                Some(trigger) => self.start_fetch(trigger).await,
                None => {
                    if !self.state.sync_pending {
                        self.set_loading(false);
                    }
                }
            }
            return;
        }

        match event {
            FetchEvent::Failed { params, error } => {
                tracing::warn!(
                    "Timeline query failed for {}, keeping {} records: {}",
                    params.category,
                    self.records.len(),
                    error
                );
                self.state.phase = Phase::Idle;
                if !self.state.sync_pending {
                    self.set_loading(false);
                }
            }
            FetchEvent::Loaded { params, outcome } => {
                self.state.phase = Phase::Applying;
                let reload_hint = outcome.reload_hint;
                self.apply(*params, outcome).await;
                self.state.phase = Phase::Idle;
                if !self.state.sync_pending {
                    self.set_loading(false);
                }

                if !reload_hint.is_unknown() {
                    let category = self
                        .params
                        .as_ref()
                        .map(|p| p.category)
                        .unwrap_or_default();
                    if let Err(e) = self
                        .request_reload(category, reload_hint == TimelineCategory::All)
                        .await
                    {
                        tracing::warn!("Failed to request reload: {:#}", e);
                    }
                }
            }
        }
    }

    async fn apply(&mut self, mut params: ListParameters, outcome: FetchOutcome) {
        let previous = self.records.len();
        let received = outcome.records.len();

        // Strict non-growth of an incremental fetch means the store is exhausted
        self.state.no_more_items = params.incremental_session && received <= previous;
        if self.state.no_more_items {
            tracing::debug!("No more items after {} records", received);
        }

        self.save_position().await;

        params.reload_hint = outcome.reload_hint;
        self.records = outcome.records;
        self.params = Some(params);
        self.applied_account_name = self.account_name.clone();
        self.surface.records_changed(&self.records);

        self.restore_position().await;
        self.state.position_restored = true;
    }

    /// Persist the viewport of the displayed window under its own parameters.
    async fn save_position(&mut self) {
        let Some(params) = self.params.as_ref() else {
            tracing::debug!("Position save skipped: no list parameters");
            return;
        };
        if params.is_empty() || self.records.is_empty() {
            tracing::debug!("Position save skipped: nothing displayed");
            return;
        }

        let last = self.records.len() - 1;
        let first = self.state.viewport.first_visible.min(last);
        let read_ahead = (first + self.page_size).min(last);
        let key = params.position_key(self.applied_account_name.as_deref());

        if let Err(e) = self
            .positions
            .save(
                &key,
                self.records[first].id,
                self.records[read_ahead].id,
                &params.search_query,
            )
            .await
        {
            tracing::warn!("Failed to save position {}: {:#}", key, e);
        }
    }

    async fn restore_position(&mut self) {
        let Some(params) = self.params.as_ref() else {
            return;
        };
        let key = params.position_key(self.applied_account_name.as_deref());

        let lookup = match self.positions.load_first(&key, &params.search_query).await {
            Ok(lookup) => lookup,
            Err(e) => {
                tracing::warn!("Failed to load position {}: {:#}", key, e);
                PositionLookup::NeverStored
            }
        };
        let found = lookup.id().and_then(|id| {
            self.records
                .iter()
                .position(|r| r.id == id)
                .map(|index| (index, id))
        });

        if let Some((index, id)) = found {
            tracing::debug!("Position restored {}={} at {}", key, id, index);
            self.state.viewport.first_visible = index;
            self.surface.scroll_to(ScrollTarget::Record { index, id });
            return;
        }

        // Searching starts from the most recent record
        if params.has_search() {
            self.state.viewport.first_visible = 0;
            self.surface.scroll_to(ScrollTarget::Top);
        } else if let Some(index) = self.records.len().checked_sub(1) {
            self.state.viewport.first_visible = index;
            self.surface.scroll_to(ScrollTarget::Bottom { index });
        }

        if lookup != PositionLookup::NeverStored {
            tracing::warn!("Position restore failed for {} ({:?})", key, lookup);
        }
        if let Err(e) = self.positions.clear(&key).await {
            tracing::warn!("Failed to clear position {}: {:#}", key, e);
        }
    }

    fn set_loading(&mut self, loading: bool) {
        if self.state.loading != loading && !self.state.finishing {
            tracing::debug!("Loading set to {}", loading);
            self.state.loading = loading;
            self.surface.set_loading(loading);
        }
    }
}
