//! Host platform interfaces: estimation sessions, light probes, frames, and
//! GPU reflection bindings.
//!
//! The platform owns every object behind these traits. The controller only
//! holds references and reacts to what the platform hands back.

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};

use crate::environment::GpuTextureHandle;
use crate::estimate::LightEstimate;

/// Identity of an estimation session, stable for the session's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Wrap a platform-assigned session number.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw session number.
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Texture format the platform prefers for reflection cubemaps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReflectionFormat {
    /// 8-bit sRGB RGBA.
    #[default]
    Srgba8,
    /// 16-bit float RGBA (HDR).
    Rgba16f,
}

/// Options passed with a light probe request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightProbeOptions {
    /// Format requested for reflection cubemaps.
    pub reflection_format: ReflectionFormat,
}

/// Handle to an ongoing ambient-lighting estimation context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightProbe {
    id: u64,
    session: SessionId,
    reflection_format: ReflectionFormat,
}

impl LightProbe {
    /// Create a probe handle. Called by platform implementations.
    pub fn new(id: u64, session: SessionId, reflection_format: ReflectionFormat) -> Self {
        Self {
            id,
            session,
            reflection_format,
        }
    }

    /// Platform-assigned probe number.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Session that granted this probe.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Reflection format the probe was granted with.
    pub fn reflection_format(&self) -> ReflectionFormat {
        self.reflection_format
    }
}

/// Why a light probe request did not produce a probe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The platform refused the request.
    #[error("light probe request rejected: {0}")]
    Rejected(String),
    /// The session cannot provide light estimation.
    #[error("light estimation is not supported by this session")]
    Unsupported,
    /// The platform dropped the request without answering.
    #[error("light probe request abandoned by the platform")]
    Abandoned,
}

/// Platform half of a one-shot probe request.
#[derive(Debug)]
pub struct ProbeResolver {
    sender: Sender<Result<LightProbe, ProbeError>>,
}

impl ProbeResolver {
    /// Grant the probe. Returns `false` if the requester has gone away.
    pub fn resolve(self, probe: LightProbe) -> bool {
        self.sender.send(Ok(probe)).is_ok()
    }

    /// Refuse the request. Returns `false` if the requester has gone away.
    pub fn reject(self, error: ProbeError) -> bool {
        self.sender.send(Err(error)).is_ok()
    }
}

/// Requester half of a one-shot probe request, polled from the control thread.
#[derive(Debug)]
pub struct ProbeGrant {
    receiver: Receiver<Result<LightProbe, ProbeError>>,
}

impl ProbeGrant {
    /// Create a connected resolver/grant pair.
    pub fn channel() -> (ProbeResolver, ProbeGrant) {
        let (sender, receiver) = bounded(1);
        (ProbeResolver { sender }, ProbeGrant { receiver })
    }

    /// Non-blocking check for the outcome.
    ///
    /// Returns `None` while the request is still outstanding. A resolver
    /// dropped without answering surfaces as [`ProbeError::Abandoned`].
    pub fn try_take(&self) -> Option<Result<LightProbe, ProbeError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ProbeError::Abandoned)),
        }
    }
}

/// Handle of a pending frame-callback registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequestId(pub u32);

/// An active estimation context provided by the host platform.
pub trait EstimationSession {
    /// Stable identity used to compare sessions and tag frames.
    fn id(&self) -> SessionId;

    /// Whether the session accepts light probe requests at all.
    fn supports_light_probe(&self) -> bool;

    /// Reflection format the platform would rather produce.
    fn preferred_reflection_format(&self) -> ReflectionFormat;

    /// Start an asynchronous light probe request.
    fn request_light_probe(&self, options: LightProbeOptions) -> ProbeGrant;

    /// Ask for the frame hook to be invoked on the next platform frame.
    fn request_animation_frame(&self) -> FrameRequestId;

    /// Withdraw a pending frame registration.
    fn cancel_animation_frame(&self, request: FrameRequestId);

    /// Acquire a GPU binding for reflection cubemaps, if the platform has one.
    fn create_reflection_binding(&self) -> Option<Box<dyn ReflectionBinding>>;
}

/// A single platform frame handed to the frame hook.
pub trait EstimationFrame {
    /// Session that produced this frame.
    fn session_id(&self) -> SessionId;

    /// Current estimate for `probe`, or `None` if nothing is available yet.
    fn light_estimate(&self, probe: &LightProbe) -> Option<LightEstimate>;
}

/// Direct access to the platform's reflection cubemap GPU texture.
pub trait ReflectionBinding {
    /// Current cubemap for `probe`, or `None` if the platform has not produced one yet.
    fn reflection_cube_map(&self, probe: &LightProbe) -> Option<GpuTextureHandle>;
}
