//! In-process estimation platform for desktop runs and tests.
//!
//! [`SimulatedSession`] records probe and frame requests instead of acting on
//! them. The driver decides when probes are granted, which estimates frames
//! carry, and what the reflection binding returns.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

use crate::environment::GpuTextureHandle;
use crate::estimate::LightEstimate;
use crate::session::{
    EstimationFrame, EstimationSession, FrameRequestId, LightProbe, LightProbeOptions, ProbeError,
    ProbeGrant, ProbeResolver, ReflectionBinding, ReflectionFormat, SessionId,
};

/// Feature set a simulated platform advertises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulatedCapabilities {
    /// Accepts light probe requests.
    pub light_probe: bool,
    /// Offers a GPU reflection binding.
    pub reflection_binding: bool,
    /// Preferred reflection format.
    pub reflection_format: ReflectionFormat,
}

impl Default for SimulatedCapabilities {
    fn default() -> Self {
        Self {
            light_probe: true,
            reflection_binding: true,
            reflection_format: ReflectionFormat::Srgba8,
        }
    }
}

impl SimulatedCapabilities {
    /// A platform with no light estimation at all.
    pub fn none() -> Self {
        Self {
            light_probe: false,
            reflection_binding: false,
            reflection_format: ReflectionFormat::Srgba8,
        }
    }
}

struct PendingProbe {
    options: LightProbeOptions,
    resolver: ProbeResolver,
}

/// Scriptable estimation session.
pub struct SimulatedSession {
    id: SessionId,
    capabilities: SimulatedCapabilities,
    pending_probes: RefCell<VecDeque<PendingProbe>>,
    granted_probes: Cell<u64>,
    next_frame_request: Cell<u32>,
    frame_requests: RefCell<HashSet<FrameRequestId>>,
    total_frame_requests: Cell<u32>,
    cube_map: Rc<Cell<Option<GpuTextureHandle>>>,
}

impl SimulatedSession {
    /// Create a session with the given identity and features.
    pub fn new(id: u64, capabilities: SimulatedCapabilities) -> Self {
        Self {
            id: SessionId::new(id),
            capabilities,
            pending_probes: RefCell::new(VecDeque::new()),
            granted_probes: Cell::new(0),
            next_frame_request: Cell::new(1),
            frame_requests: RefCell::new(HashSet::new()),
            total_frame_requests: Cell::new(0),
            cube_map: Rc::new(Cell::new(None)),
        }
    }

    /// Probe requests that have not been answered yet.
    pub fn pending_probe_requests(&self) -> usize {
        self.pending_probes.borrow().len()
    }

    /// Options of the oldest unanswered probe request.
    pub fn oldest_probe_options(&self) -> Option<LightProbeOptions> {
        self.pending_probes.borrow().front().map(|p| p.options)
    }

    /// Grant the oldest pending probe request.
    ///
    /// Returns the probe, or `None` if nothing was pending. The probe is
    /// returned even when the requester has already gone away.
    pub fn grant_light_probe(&self) -> Option<LightProbe> {
        let pending = self.pending_probes.borrow_mut().pop_front()?;
        let number = self.granted_probes.get() + 1;
        self.granted_probes.set(number);
        let probe = LightProbe::new(number, self.id, pending.options.reflection_format);
        pending.resolver.resolve(probe.clone());
        Some(probe)
    }

    /// Reject the oldest pending probe request. Returns `false` if nothing was pending.
    pub fn reject_light_probe(&self, error: ProbeError) -> bool {
        match self.pending_probes.borrow_mut().pop_front() {
            Some(pending) => {
                pending.resolver.reject(error);
                true
            }
            None => false,
        }
    }

    /// Frame registrations that are still outstanding.
    pub fn outstanding_frame_requests(&self) -> usize {
        self.frame_requests.borrow().len()
    }

    /// Frame registrations made over the session's lifetime.
    pub fn total_frame_requests(&self) -> u32 {
        self.total_frame_requests.get()
    }

    /// Set what the reflection binding reports as the current cubemap.
    pub fn set_reflection_cube_map(&self, handle: Option<GpuTextureHandle>) {
        self.cube_map.set(handle);
    }

    /// Build the next frame, consuming one outstanding frame registration.
    ///
    /// Returns `None` when nobody asked for a frame, mirroring a platform
    /// that only calls back registered callbacks.
    pub fn next_frame(&self, estimate: Option<LightEstimate>) -> Option<SimulatedFrame> {
        let mut requests = self.frame_requests.borrow_mut();
        if requests.is_empty() {
            return None;
        }
        requests.clear();
        Some(SimulatedFrame {
            session: self.id,
            estimate,
        })
    }

    /// Build a frame without consulting frame registrations.
    pub fn frame(&self, estimate: Option<LightEstimate>) -> SimulatedFrame {
        SimulatedFrame {
            session: self.id,
            estimate,
        }
    }
}

impl EstimationSession for SimulatedSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn supports_light_probe(&self) -> bool {
        self.capabilities.light_probe
    }

    fn preferred_reflection_format(&self) -> ReflectionFormat {
        self.capabilities.reflection_format
    }

    fn request_light_probe(&self, options: LightProbeOptions) -> ProbeGrant {
        let (resolver, grant) = ProbeGrant::channel();
        if !self.capabilities.light_probe {
            resolver.reject(ProbeError::Unsupported);
            return grant;
        }
        self.pending_probes
            .borrow_mut()
            .push_back(PendingProbe { options, resolver });
        grant
    }

    fn request_animation_frame(&self) -> FrameRequestId {
        let id = FrameRequestId(self.next_frame_request.get());
        self.next_frame_request.set(id.0.wrapping_add(1));
        self.total_frame_requests.set(self.total_frame_requests.get() + 1);
        self.frame_requests.borrow_mut().insert(id);
        id
    }

    fn cancel_animation_frame(&self, request: FrameRequestId) {
        self.frame_requests.borrow_mut().remove(&request);
    }

    fn create_reflection_binding(&self) -> Option<Box<dyn ReflectionBinding>> {
        if !self.capabilities.reflection_binding {
            return None;
        }
        Some(Box::new(SimulatedBinding {
            session: self.id,
            cube_map: Rc::clone(&self.cube_map),
        }))
    }
}

/// Frame produced by a [`SimulatedSession`].
#[derive(Clone, Debug)]
pub struct SimulatedFrame {
    session: SessionId,
    estimate: Option<LightEstimate>,
}

impl EstimationFrame for SimulatedFrame {
    fn session_id(&self) -> SessionId {
        self.session
    }

    fn light_estimate(&self, probe: &LightProbe) -> Option<LightEstimate> {
        if probe.session() != self.session {
            return None;
        }
        self.estimate.clone()
    }
}

struct SimulatedBinding {
    session: SessionId,
    cube_map: Rc<Cell<Option<GpuTextureHandle>>>,
}

impl ReflectionBinding for SimulatedBinding {
    fn reflection_cube_map(&self, probe: &LightProbe) -> Option<GpuTextureHandle> {
        if probe.session() != self.session {
            return None;
        }
        self.cube_map.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_resolves_request() {
        let session = SimulatedSession::new(1, SimulatedCapabilities::default());
        let grant = session.request_light_probe(LightProbeOptions {
            reflection_format: ReflectionFormat::Rgba16f,
        });
        assert_eq!(session.pending_probe_requests(), 1);
        let probe = session.grant_light_probe().unwrap();
        assert_eq!(probe.reflection_format(), ReflectionFormat::Rgba16f);
        assert_eq!(grant.try_take(), Some(Ok(probe)));
        assert!(session.grant_light_probe().is_none());
    }

    #[test]
    fn test_next_frame_requires_registration() {
        let session = SimulatedSession::new(1, SimulatedCapabilities::default());
        assert!(session.next_frame(None).is_none());
        let id = session.request_animation_frame();
        assert!(session.next_frame(None).is_some());
        assert!(session.next_frame(None).is_none());

        let again = session.request_animation_frame();
        assert_ne!(id, again);
        session.cancel_animation_frame(again);
        assert_eq!(session.outstanding_frame_requests(), 0);
        assert_eq!(session.total_frame_requests(), 2);
    }

    #[test]
    fn test_frame_request_ids_wrap() {
        let session = SimulatedSession::new(1, SimulatedCapabilities::default());
        session.next_frame_request.set(u32::MAX);
        assert_eq!(session.request_animation_frame(), FrameRequestId(u32::MAX));
        assert_eq!(session.request_animation_frame(), FrameRequestId(0));
        assert_eq!(session.outstanding_frame_requests(), 2);
    }

    #[test]
    fn test_binding_follows_cube_map() {
        let session = SimulatedSession::new(4, SimulatedCapabilities::default());
        let binding = session.create_reflection_binding().unwrap();
        let probe = LightProbe::new(1, SessionId::new(4), ReflectionFormat::Srgba8);
        assert!(binding.reflection_cube_map(&probe).is_none());
        session.set_reflection_cube_map(Some(GpuTextureHandle(9)));
        assert_eq!(binding.reflection_cube_map(&probe), Some(GpuTextureHandle(9)));

        let foreign = LightProbe::new(1, SessionId::new(5), ReflectionFormat::Srgba8);
        assert!(binding.reflection_cube_map(&foreign).is_none());
    }

    #[test]
    fn test_unsupported_request_is_rejected() {
        let session = SimulatedSession::new(1, SimulatedCapabilities::none());
        let grant = session.request_light_probe(LightProbeOptions::default());
        assert_eq!(session.pending_probe_requests(), 0);
        assert_eq!(grant.try_take(), Some(Err(ProbeError::Unsupported)));
    }

    #[test]
    fn test_no_binding_without_capability() {
        let session = SimulatedSession::new(1, SimulatedCapabilities::none());
        assert!(!session.supports_light_probe());
        assert!(session.create_reflection_binding().is_none());
    }
}
