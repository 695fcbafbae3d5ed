//! Lighting controller: switches a scene between static studio lighting and
//! platform-estimated lighting.
//!
//! ```text
//!   set_session(Some)          grant resolved
//! Inactive ──────────────▶ Probing ──────────────▶ Active
//!    ▲                        │                      │
//!    └──── set_session(None) / rejected grant ◀──────┘
//! ```
//!
//! The host drives everything from one thread. [`LightingController::update`]
//! polls the outstanding probe grant, installs finished panoramas, and fires
//! the reflection refresh timer. [`LightingController::on_frame`] is called
//! for each platform frame the controller asked for.

use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use lumen_config::LightingConfig;
use lumen_lighting::{AmbientProbeLight, DirectionalLight, HemisphereLight};
use tracing::{debug, info, trace, warn};

use crate::environment::{EnvironmentMap, GpuTextureHandle, RenderBackend, SwapOutcome};
use crate::error::LightingError;
use crate::estimate::LightEstimate;
use crate::events::{EventDispatcher, LightingEvent, SubscriptionId};
use crate::group::{LightGroup, LightNode};
use crate::panorama::{
    PanoramaCompletion, PanoramaDelivery, PanoramaLoader, PanoramaRequest, PanoramaTicket,
};
use crate::refresh::RefreshTimer;
use crate::session::{
    EstimationFrame, EstimationSession, FrameRequestId, LightProbe, LightProbeOptions, ProbeGrant,
    ReflectionBinding,
};

/// Observable state of the session state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightingState {
    /// No estimation: static lighting only.
    Inactive,
    /// Probe requested, waiting for the platform.
    Probing,
    /// Probe granted, frame loop running.
    Active,
}

enum Phase {
    Inactive,
    Probing { grant: ProbeGrant },
    Active(ActiveEstimation),
}

struct ActiveEstimation {
    probe: LightProbe,
    binding: Option<Box<dyn ReflectionBinding>>,
    refresh: Option<RefreshTimer>,
    frame_request: Option<FrameRequestId>,
    /// Platform cubemap currently wrapped when the backend cannot swap in place.
    wrapped: Option<GpuTextureHandle>,
}

/// Owns the static and estimated lighting branches and swaps between them.
pub struct LightingController<B: RenderBackend> {
    backend: B,
    loader: Box<dyn PanoramaLoader>,
    estimation_enabled: bool,
    refresh_interval: Duration,
    cube_size: u32,

    group: LightGroup,
    events: EventDispatcher,
    hemisphere: HemisphereLight,
    ambient_probe: Option<AmbientProbeLight>,
    directional: Option<DirectionalLight>,

    static_env: Option<EnvironmentMap>,
    dynamic_env: Option<EnvironmentMap>,

    session: Option<Rc<dyn EstimationSession>>,
    phase: Phase,

    next_ticket: u64,
    completion_tx: Sender<PanoramaCompletion>,
    completion_rx: Receiver<PanoramaCompletion>,
    pending_panoramas: HashMap<PanoramaTicket, Sender<Result<EnvironmentMap, LightingError>>>,
}

impl<B: RenderBackend> LightingController<B> {
    /// Create a controller with the hemisphere light in its group and no
    /// environment map.
    pub fn new(backend: B, loader: impl PanoramaLoader + 'static, config: &LightingConfig) -> Self {
        let hemi = &config.hemisphere;
        let hemisphere = HemisphereLight::new(
            glam::Vec3::from_array(hemi.sky_color),
            glam::Vec3::from_array(hemi.ground_color),
            hemi.intensity,
        );
        let mut group = LightGroup::new();
        group.add(LightNode::Hemisphere);
        let (completion_tx, completion_rx) = unbounded();

        Self {
            backend,
            loader: Box::new(loader),
            estimation_enabled: config.light_estimation,
            refresh_interval: Duration::from_millis(config.reflection_refresh_ms.max(1)),
            cube_size: config.reflection_cube_size.max(1),
            group,
            events: EventDispatcher::new(),
            hemisphere,
            ambient_probe: None,
            directional: None,
            static_env: None,
            dynamic_env: None,
            session: None,
            phase: Phase::Inactive,
            next_ticket: 0,
            completion_tx,
            completion_rx,
            pending_panoramas: HashMap::new(),
        }
    }

    // --- Static branch ---

    /// Start loading an equirectangular panorama as the static environment map.
    ///
    /// The result is installed during a later [`update`](Self::update).
    /// Overlapping loads are installed in the order they finish, so the last
    /// one to finish wins.
    pub fn load_panorama(&mut self, url: &str) -> PanoramaRequest {
        self.backend.compile_equirect_shader();

        let ticket = PanoramaTicket(self.next_ticket);
        self.next_ticket += 1;
        let (reply_tx, reply_rx) = bounded(1);
        self.pending_panoramas.insert(ticket, reply_tx);

        debug!(url, ticket = ticket.0, "loading panorama");
        self.loader.load(PanoramaDelivery::new(
            ticket,
            url.to_string(),
            self.completion_tx.clone(),
        ));
        PanoramaRequest::new(ticket, url.to_string(), reply_rx)
    }

    /// The exposed environment map: estimated if present, else static.
    pub fn environment_map(&self) -> Option<&EnvironmentMap> {
        self.dynamic_env.as_ref().or(self.static_env.as_ref())
    }

    /// Panorama loads that have not finished yet.
    pub fn pending_panoramas(&self) -> usize {
        self.pending_panoramas.len()
    }

    // --- Session state machine ---

    /// Current estimation session, if any.
    pub fn session(&self) -> Option<&Rc<dyn EstimationSession>> {
        self.session.as_ref()
    }

    /// Current state of the session state machine.
    pub fn state(&self) -> LightingState {
        match self.phase {
            Phase::Inactive => LightingState::Inactive,
            Phase::Probing { .. } => LightingState::Probing,
            Phase::Active(_) => LightingState::Active,
        }
    }

    /// Assign or clear the estimation session.
    ///
    /// Assigning the current session again does nothing. Assigning a
    /// different session ends the previous one first. Sessions that cannot
    /// provide light probes leave lighting static.
    pub fn set_session(&mut self, session: Option<Rc<dyn EstimationSession>>) {
        let current = self.session.as_ref().map(|s| s.id());
        let next = session.as_ref().map(|s| s.id());
        if current == next {
            return;
        }

        if self.session.is_some() {
            self.end_session();
        }

        let Some(session) = session else {
            return;
        };
        self.session = Some(Rc::clone(&session));

        if !self.estimation_enabled {
            info!(session = session.id().get(), "light estimation disabled by config");
            return;
        }
        if !session.supports_light_probe() {
            info!(
                session = session.id().get(),
                "session has no light estimation; keeping static lighting"
            );
            return;
        }

        let options = LightProbeOptions {
            reflection_format: session.preferred_reflection_format(),
        };
        debug!(session = session.id().get(), ?options, "requesting light probe");
        let grant = session.request_light_probe(options);
        self.transition(Phase::Probing { grant });
    }

    /// Cooperative pump: resolve the probe grant, install finished panoramas,
    /// and refresh the reflection cubemap when its timer is due.
    pub fn update(&mut self, now: Instant) {
        self.poll_probe_grant(now);
        self.drain_panoramas();

        let refresh_due = match &mut self.phase {
            Phase::Active(active) => active.refresh.as_mut().is_some_and(|t| t.poll(now)),
            _ => false,
        };
        if refresh_due {
            self.update_reflection();
        }
    }

    fn poll_probe_grant(&mut self, now: Instant) {
        let Phase::Probing { grant } = &self.phase else {
            return;
        };
        let Some(outcome) = grant.try_take() else {
            return;
        };
        match outcome {
            Ok(probe) => self.activate(probe, now),
            Err(err) => {
                warn!(%err, "light probe request failed; keeping static lighting");
                self.transition(Phase::Inactive);
            }
        }
    }

    fn activate(&mut self, probe: LightProbe, now: Instant) {
        let Some(session) = self.session.clone() else {
            return;
        };
        // The grant receiver lives in the Probing phase, so only the current
        // assignment can resolve. A probe tagged for another session is a
        // platform error.
        if probe.session() != session.id() {
            warn!(
                probe_session = probe.session().get(),
                session = session.id().get(),
                "discarding light probe granted for a different session"
            );
            self.transition(Phase::Inactive);
            return;
        }

        let binding = session.create_reflection_binding();
        let refresh = binding
            .as_ref()
            .map(|_| RefreshTimer::new(self.refresh_interval, now));
        info!(
            session = session.id().get(),
            probe = probe.id(),
            reflection_binding = binding.is_some(),
            "light estimation active"
        );

        self.transition(Phase::Active(ActiveEstimation {
            probe,
            binding,
            refresh,
            frame_request: None,
            wrapped: None,
        }));

        if self.dynamic_env.is_none() {
            self.dynamic_env = Some(self.backend.create_cube_render_target(self.cube_size));
            self.emit_environment_changed();
        }

        let request = session.request_animation_frame();
        if let Phase::Active(active) = &mut self.phase {
            active.frame_request = Some(request);
        }

        self.backend.compile_cubemap_shader();
    }

    fn end_session(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Phase::Active(ActiveEstimation {
            frame_request: Some(request),
            ..
        }) = &self.phase
        {
            session.cancel_animation_frame(*request);
        }

        self.transition(Phase::Inactive);
        self.restore_static_lighting();

        if let Some(map) = self.dynamic_env.take() {
            self.backend.dispose(&map);
            self.emit_environment_changed();
        }
        info!(session = session.id().get(), "estimation session ended");
    }

    fn restore_static_lighting(&mut self) {
        if self.ambient_probe.take().is_some() {
            self.group.remove(LightNode::AmbientProbe);
            self.group.add(LightNode::Hemisphere);
        }
        if self.directional.take().is_some() {
            self.group.remove(LightNode::Directional);
        }
    }

    fn transition(&mut self, phase: Phase) {
        let from = self.state();
        self.phase = phase;
        let to = self.state();
        if from != to {
            debug!(?from, ?to, "lighting state changed");
            self.events.emit(&LightingEvent::StateChanged { from, to });
        }
    }

    // --- Estimated branch ---

    /// Platform frame hook.
    ///
    /// Replaces the frame registration, then applies the frame's estimate if
    /// there is one. Frames from any session other than the current one are
    /// ignored and end that session's frame loop.
    pub fn on_frame(&mut self, time: f64, frame: &dyn EstimationFrame) {
        let Some(session) = self.session.clone() else {
            return;
        };
        if frame.session_id() != session.id() {
            trace!(frame_session = frame.session_id().get(), "ignoring frame from another session");
            return;
        }
        let Phase::Active(active) = &mut self.phase else {
            return;
        };

        // Keep at most one registration outstanding.
        if let Some(previous) = active.frame_request.take() {
            session.cancel_animation_frame(previous);
        }
        active.frame_request = Some(session.request_animation_frame());

        let Some(estimate) = frame.light_estimate(&active.probe) else {
            trace!(time, "no light estimate this frame");
            return;
        };
        self.apply_estimate(&estimate);
    }

    fn apply_estimate(&mut self, estimate: &LightEstimate) {
        if self.ambient_probe.is_none() {
            self.ambient_probe = Some(AmbientProbeLight::default());
            self.group.add(LightNode::AmbientProbe);
            self.group.remove(LightNode::Hemisphere);
            debug!("switched ambient lighting to the estimated probe");
        }
        if self.directional.is_none() {
            self.directional = Some(DirectionalLight::default());
            self.group.add(LightNode::Directional);
        }

        if let Some(probe) = self.ambient_probe.as_mut() {
            probe.sh.copy_from_array(&estimate.spherical_harmonics_coefficients);
        }
        if let Some(light) = self.directional.as_mut() {
            light.apply_primary_light(
                estimate.primary_light_direction,
                estimate.primary_light_intensity,
            );
        }
    }

    /// Pull the platform's current reflection cubemap into the estimated
    /// environment map. Does nothing without a binding or before the
    /// platform has produced a cubemap.
    pub fn update_reflection(&mut self) {
        let Phase::Active(active) = &self.phase else {
            return;
        };
        let Some(binding) = &active.binding else {
            return;
        };
        let Some(handle) = binding.reflection_cube_map(&active.probe) else {
            trace!("reflection cubemap not ready");
            return;
        };
        if active.wrapped == Some(handle) {
            return;
        }
        let Some(map) = self.dynamic_env.clone() else {
            return;
        };

        match self.backend.swap_gpu_texture(&map, handle) {
            SwapOutcome::Swapped => trace!(texture = map.id().0, ?handle, "reflection refreshed"),
            SwapOutcome::NotResident => {
                trace!(texture = map.id().0, "environment map not resident yet")
            }
            SwapOutcome::Unsupported => {
                let replacement = self.backend.wrap_external_cube_map(handle);
                debug!(
                    old = map.id().0,
                    new = replacement.id().0,
                    "replacing estimated environment map"
                );
                self.backend.dispose(&map);
                self.dynamic_env = Some(replacement);
                if let Phase::Active(active) = &mut self.phase {
                    active.wrapped = Some(handle);
                }
                self.emit_environment_changed();
            }
        }
    }

    // --- Panorama completions ---

    fn drain_panoramas(&mut self) {
        while let Ok(completion) = self.completion_rx.try_recv() {
            let Some(reply) = self.pending_panoramas.remove(&completion.ticket) else {
                trace!(ticket = completion.ticket.0, "ignoring completion for an unknown panorama");
                continue;
            };
            let url = completion.url;
            let outcome = match completion.result {
                Ok(image) => self
                    .backend
                    .bake_equirect(&image)
                    .map_err(|source| LightingError::Bake {
                        url: url.clone(),
                        source,
                    }),
                Err(source) => Err(LightingError::Load {
                    url: url.clone(),
                    source,
                }),
            };

            match &outcome {
                Ok(map) => {
                    info!(url, texture = map.id().0, "panorama installed");
                    self.install_static(map.clone());
                }
                Err(err) => warn!(%err, "panorama failed"),
            }
            // The caller may have dropped its request.
            let _ = reply.send(outcome);
        }
    }

    fn install_static(&mut self, map: EnvironmentMap) {
        if let Some(previous) = self.static_env.replace(map) {
            self.backend.dispose(&previous);
        }
        if self.dynamic_env.is_none() {
            self.emit_environment_changed();
        }
    }

    fn emit_environment_changed(&mut self) {
        let event = LightingEvent::EnvironmentMapChanged {
            environment_map: self.environment_map().cloned(),
        };
        self.events.emit(&event);
    }

    // --- Observers and accessors ---

    /// Register a listener for lighting events.
    pub fn subscribe(&mut self, listener: impl FnMut(&LightingEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Lights currently in the scene group.
    pub fn group(&self) -> &LightGroup {
        &self.group
    }

    /// The static hemisphere light. Only lit while it is in the group.
    pub fn hemisphere_light(&self) -> &HemisphereLight {
        &self.hemisphere
    }

    /// The estimated ambient probe light, once an estimate has arrived.
    pub fn ambient_probe(&self) -> Option<&AmbientProbeLight> {
        self.ambient_probe.as_ref()
    }

    /// The estimated directional light, once an estimate has arrived.
    pub fn directional_light(&self) -> Option<&DirectionalLight> {
        self.directional.as_ref()
    }

    /// Granted light probe while estimation is active.
    pub fn light_probe(&self) -> Option<&LightProbe> {
        match &self.phase {
            Phase::Active(active) => Some(&active.probe),
            _ => None,
        }
    }

    /// Whether the platform supplied a GPU reflection binding.
    pub fn has_reflection_binding(&self) -> bool {
        matches!(&self.phase, Phase::Active(active) if active.binding.is_some())
    }

    /// The render backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The render backend, mutably.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

impl<B: RenderBackend> Drop for LightingController<B> {
    fn drop(&mut self) {
        self.end_session();
        if let Some(map) = self.static_env.take() {
            self.backend.dispose(&map);
        }
    }
}
