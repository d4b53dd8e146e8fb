//! The editor session.

use std::rc::Rc;
use std::sync::Arc;

use reelkit_captions::{CaptionCue, CaptionLoader, CaptionSource};
use reelkit_common::clock::{FrameClock, TimerId};
use reelkit_common::config::PreviewDefaults;
use reelkit_common::error::{ReelError, ReelResult};
use reelkit_playback_engine::{PreviewPlayer, TickOutcome};
use reelkit_project_model::{
    init_from_payload_with, AudioPatch, BackendProject, LoadDefaults, MediaStatus, MetaPatch,
    Project, ProjectError, ProjectPatch, ScenePatch,
};
use reelkit_render_engine::{
    ExportOutcome, ExportRequest, FrameComposition, ProjectBackend, RenderOrchestrator,
    SaveOutcome, SaveRequest, SaveState,
};

/// Identifies which open project a pending response belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    media_id: String,
    generation: u64,
}

impl RequestTicket {
    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A save issued for the project open when it was started.
pub struct PendingSave<B> {
    ticket: RequestTicket,
    request: SaveRequest<B>,
}

impl<B: ProjectBackend> PendingSave<B> {
    pub fn ticket(&self) -> &RequestTicket {
        &self.ticket
    }

    pub fn patch(&self) -> &ProjectPatch {
        self.request.patch()
    }

    /// Send the patch without touching the session.
    pub async fn send(self) -> SaveReply {
        SaveReply {
            ticket: self.ticket,
            outcome: self.request.send().await,
        }
    }
}

/// Backend answer to a [`PendingSave`].
pub struct SaveReply {
    ticket: RequestTicket,
    outcome: SaveOutcome,
}

impl SaveReply {
    pub fn ticket(&self) -> &RequestTicket {
        &self.ticket
    }
}

/// An export issued for the project open when it was started.
pub struct PendingExport<B> {
    ticket: RequestTicket,
    request: ExportRequest<B>,
}

impl<B: ProjectBackend> PendingExport<B> {
    pub fn ticket(&self) -> &RequestTicket {
        &self.ticket
    }

    /// Save and request the new version without touching the session.
    pub async fn send(self) -> ExportReply {
        ExportReply {
            ticket: self.ticket,
            outcome: self.request.send().await,
        }
    }
}

/// Backend answer to a [`PendingExport`].
pub struct ExportReply {
    ticket: RequestTicket,
    outcome: ExportOutcome,
}

impl ExportReply {
    pub fn ticket(&self) -> &RequestTicket {
        &self.ticket
    }
}

/// Editing state for one open project at a time.
pub struct EditorSession<B, S> {
    clock: Rc<dyn FrameClock>,
    orchestrator: RenderOrchestrator<B>,
    captions: CaptionLoader<S>,
    defaults: PreviewDefaults,
    generation: u64,
    media_id: Option<String>,
    project: Option<Project>,
    player: Option<PreviewPlayer>,
}

impl<B: ProjectBackend, S: CaptionSource> EditorSession<B, S> {
    pub fn new(
        backend: B,
        captions: CaptionLoader<S>,
        clock: Rc<dyn FrameClock>,
        defaults: PreviewDefaults,
    ) -> Self {
        Self {
            clock,
            orchestrator: RenderOrchestrator::new(backend, MediaStatus::default()),
            captions,
            defaults,
            generation: 0,
            media_id: None,
            project: None,
            player: None,
        }
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn player(&self) -> Option<&PreviewPlayer> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut PreviewPlayer> {
        self.player.as_mut()
    }

    pub fn orchestrator(&self) -> &RenderOrchestrator<B> {
        &self.orchestrator
    }

    pub fn status(&self) -> MediaStatus {
        self.orchestrator.status()
    }

    pub fn save_state(&self) -> SaveState {
        self.orchestrator.save_state()
    }

    /// Ticket for the project currently open, if any.
    pub fn current_ticket(&self) -> Option<RequestTicket> {
        self.media_id.as_ref().map(|media_id| RequestTicket {
            media_id: media_id.clone(),
            generation: self.generation,
        })
    }

    /// Whether a response issued under `ticket` may still be applied.
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        ticket.generation == self.generation && self.media_id.as_deref() == Some(&ticket.media_id)
    }

    /// Tear down the open project.
    ///
    /// Cancels the preview clock immediately and invalidates every
    /// outstanding ticket.
    pub fn reset(&mut self) {
        if let Some(mut player) = self.player.take() {
            player.release();
        }
        self.generation += 1;
        if let Some(media_id) = self.media_id.take() {
            tracing::info!(media_id = %media_id, generation = self.generation, "Closed project");
        }
        self.project = None;
        self.orchestrator.reset();
    }

    /// Start opening `media_id`. Responses must be applied with the
    /// returned ticket.
    pub fn begin_open(&mut self, media_id: impl Into<String>) -> RequestTicket {
        self.reset();
        let media_id = media_id.into();
        tracing::info!(media_id = %media_id, generation = self.generation, "Opening project");
        self.media_id = Some(media_id.clone());
        RequestTicket {
            media_id,
            generation: self.generation,
        }
    }

    /// Fetch, load and caption `media_id`.
    pub async fn open(&mut self, media_id: &str) -> ReelResult<()> {
        let ticket = self.begin_open(media_id);
        let payload = self.orchestrator.backend().fetch_project(media_id).await?;
        if self.apply_fetched(&ticket, payload)? {
            self.load_captions().await;
        }
        Ok(())
    }

    /// Install a fetched project. Returns `false` if the ticket is stale.
    pub fn apply_fetched(
        &mut self,
        ticket: &RequestTicket,
        payload: BackendProject,
    ) -> ReelResult<bool> {
        if !self.is_current(ticket) {
            tracing::debug!(
                media_id = %ticket.media_id,
                generation = ticket.generation,
                "Discarding stale project response"
            );
            return Ok(false);
        }
        if payload.id != ticket.media_id {
            return Err(ReelError::backend(format!(
                "Requested project {} but backend returned {}",
                ticket.media_id, payload.id
            )));
        }

        let project = init_from_payload_with(
            &payload,
            &LoadDefaults {
                fps: self.defaults.fps,
                scene_secs: self.defaults.default_scene_secs,
                fallback_secs: self.defaults.fallback_duration_secs,
            },
        );

        let mut player = PreviewPlayer::for_project(Rc::clone(&self.clock), &project);
        player.set_loop(self.defaults.loop_playback);
        if let Err(e) = player.set_rate(self.defaults.playback_rate) {
            tracing::warn!(error = %e, "Ignoring configured playback rate");
        }

        tracing::info!(
            media_id = %payload.id,
            status = %payload.status,
            scenes = project.scenes().len(),
            total_frames = project.total_frames(),
            "Project loaded"
        );
        self.orchestrator.set_status(payload.status);
        self.orchestrator.mark_clean();
        self.player = Some(player);
        self.project = Some(project);
        Ok(true)
    }

    /// Install parsed captions. Returns `false` if the ticket is stale or
    /// the caption URL changed since the load started.
    pub fn apply_captions(
        &mut self,
        ticket: &RequestTicket,
        url: &str,
        cues: Arc<Vec<CaptionCue>>,
    ) -> bool {
        let matches_url = self
            .project
            .as_ref()
            .and_then(Project::caption_url)
            .is_some_and(|current| current == url);
        if !self.is_current(ticket) || !matches_url {
            tracing::debug!(url, "Discarding stale caption response");
            return false;
        }
        if let Some(player) = self.player.as_mut() {
            player.set_captions(cues);
        }
        true
    }

    /// Load the captions for the open project's caption URL.
    pub async fn load_captions(&mut self) {
        let (ticket, url) = match (
            self.current_ticket(),
            self.project
                .as_ref()
                .and_then(Project::caption_url)
                .map(str::to_string),
        ) {
            (Some(ticket), Some(url)) => (ticket, url),
            _ => return,
        };
        let cues = self.captions.load(&url).await;
        self.apply_captions(&ticket, &url, cues);
    }

    /// Refresh the open project's status from the backend.
    pub async fn refresh_status(&mut self) -> ReelResult<MediaStatus> {
        let ticket = self
            .current_ticket()
            .ok_or_else(|| ReelError::not_found("open project"))?;
        let status = self.orchestrator.poll_status(&ticket.media_id).await?;
        if self.is_current(&ticket) {
            self.orchestrator.set_status(status);
        }
        Ok(status)
    }

    pub fn add_scene(&mut self, after_index: Option<usize>) -> ReelResult<String> {
        self.mutate(|project| Ok(project.add_scene(after_index)))
    }

    /// Remove a scene. Returns `false` for the last remaining scene.
    pub fn remove_scene(&mut self, id: &str) -> ReelResult<bool> {
        self.mutate(|project| Ok(project.remove_scene(id)))
    }

    pub fn update_scene(&mut self, id: &str, patch: ScenePatch) -> ReelResult<()> {
        self.mutate(|project| project.update_scene(id, patch))
    }

    pub fn update_meta(&mut self, patch: MetaPatch) -> ReelResult<()> {
        self.mutate(|project| project.update_meta(patch))
    }

    pub fn update_audio(&mut self, patch: AudioPatch) -> ReelResult<()> {
        self.mutate(|project| project.update_audio(patch))
    }

    pub fn clear_audio(&mut self) -> ReelResult<()> {
        self.mutate(|project| {
            project.clear_audio();
            Ok(())
        })
    }

    /// Replace the caption source. Returns whether it changed; a change
    /// clears the current cues until [`Self::load_captions`] runs.
    pub fn set_caption_url(&mut self, url: Option<String>) -> ReelResult<bool> {
        let changed = self.mutate(|project| Ok(project.set_caption_url(url)))?;
        if changed {
            if let Some(url) = self.project.as_ref().and_then(Project::caption_url) {
                self.captions.invalidate(url);
            }
            if let Some(player) = self.player.as_mut() {
                player.set_captions(Arc::new(Vec::new()));
            }
        }
        Ok(changed)
    }

    /// Start persisting the open project without rendering.
    ///
    /// The returned request borrows nothing from the session, so the
    /// preview keeps ticking and [`Self::reset`] stays available while it
    /// is in flight. Apply its reply with [`Self::apply_save_result`].
    pub fn begin_save(&self) -> ReelResult<PendingSave<B>> {
        let (ticket, project) = self.open_ticket()?;
        Ok(PendingSave {
            ticket,
            request: self.orchestrator.begin_save(project)?,
        })
    }

    /// Apply a save reply. Returns `Ok(false)` if the ticket is stale.
    pub fn apply_save_result(&self, reply: SaveReply) -> ReelResult<bool> {
        if !self.is_current(&reply.ticket) {
            tracing::debug!(
                media_id = %reply.ticket.media_id,
                generation = reply.ticket.generation,
                "Discarding stale save response"
            );
            return Ok(false);
        }
        self.orchestrator.finish_save(reply.outcome)?;
        Ok(true)
    }

    /// Start a save-then-export of the open project. Apply its reply with
    /// [`Self::apply_export_result`].
    pub fn begin_export(&self) -> ReelResult<PendingExport<B>> {
        let (ticket, project) = self.open_ticket()?;
        Ok(PendingExport {
            ticket,
            request: self.orchestrator.begin_export(project)?,
        })
    }

    /// Apply an export reply. Returns the new version's media id, or `None`
    /// if the ticket is stale.
    pub fn apply_export_result(&self, reply: ExportReply) -> ReelResult<Option<String>> {
        if !self.is_current(&reply.ticket) {
            tracing::debug!(
                media_id = %reply.ticket.media_id,
                generation = reply.ticket.generation,
                "Discarding stale export response"
            );
            return Ok(None);
        }
        self.orchestrator.finish_export(reply.outcome).map(Some)
    }

    /// Persist the open project without rendering, holding the session
    /// until the backend answers. Hosts that tick meanwhile use
    /// [`Self::begin_save`].
    pub async fn save(&self) -> ReelResult<()> {
        let reply = self.begin_save()?.send().await;
        self.apply_save_result(reply).map(|_| ())
    }

    /// Save and render a new version; returns its media id. Holds the
    /// session like [`Self::save`].
    pub async fn export(&self) -> ReelResult<String> {
        let pending = self.begin_export()?;
        let media_id = pending.ticket().media_id().to_string();
        let reply = pending.send().await;
        self.apply_export_result(reply)?.ok_or_else(|| {
            ReelError::export(format!("Project {media_id} was closed during export"))
        })
    }

    /// Compose the player's current frame.
    pub fn render(&self) -> Option<FrameComposition> {
        match (&self.project, &self.player) {
            (Some(project), Some(player)) => Some(player.render(project)),
            _ => None,
        }
    }

    /// Forward a due timer to the preview.
    pub fn on_timer(&mut self, id: TimerId) -> TickOutcome {
        match self.player.as_mut() {
            Some(player) => player.on_timer(id),
            None => TickOutcome::Ignored,
        }
    }

    fn open_ticket(&self) -> ReelResult<(RequestTicket, &Project)> {
        match (self.current_ticket(), self.project.as_ref()) {
            (Some(ticket), Some(project)) => Ok((ticket, project)),
            _ => Err(ReelError::not_found("open project")),
        }
    }

    fn mutate<T>(
        &mut self,
        edit: impl FnOnce(&mut Project) -> Result<T, ProjectError>,
    ) -> ReelResult<T> {
        let status = self.orchestrator.status();
        if !status.can_edit() {
            return Err(ReelError::timeline(format!(
                "Project cannot be edited while {status}"
            )));
        }
        let project = self
            .project
            .as_mut()
            .ok_or_else(|| ReelError::not_found("open project"))?;

        let value = edit(project).map_err(|e| ReelError::timeline(e.to_string()))?;
        self.orchestrator.mark_dirty();
        if let Some(player) = self.player.as_mut() {
            player.sync(project);
        }
        Ok(value)
    }
}
