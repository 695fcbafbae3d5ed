//! Adaptive AR scene lighting.
//!
//! [`LightingController`] keeps a scene lit with a static hemisphere light and
//! a prefiltered panorama until an estimation session grants a light probe,
//! then drives an SH ambient light, a directional light, and a live
//! reflection cubemap from the platform's per-frame estimates.
//!
//! The platform, the renderer, and the image loader are reached through the
//! [`EstimationSession`], [`RenderBackend`], and [`PanoramaLoader`] traits.
//! [`SimulatedSession`], [`HeadlessBackend`], and [`FilePanoramaLoader`] are
//! ready-made implementations for running without a device or GPU.

mod controller;
pub mod environment;
mod error;
mod estimate;
mod events;
mod group;
mod headless;
pub mod panorama;
mod refresh;
pub mod session;
pub mod simulated;

pub use controller::{LightingController, LightingState};
pub use environment::{
    BackendError, EnvironmentKind, EnvironmentMap, GpuTextureHandle, RenderBackend, SwapOutcome,
    TextureId, TextureProperties,
};
pub use error::LightingError;
pub use estimate::LightEstimate;
pub use events::{EventDispatcher, LightingEvent, SubscriptionId};
pub use group::{LightGroup, LightNode};
pub use headless::HeadlessBackend;
pub use panorama::{
    EquirectImage, FilePanoramaLoader, LoadError, PanoramaDelivery, PanoramaLoader,
    PanoramaRequest, PanoramaTicket,
};
pub use refresh::RefreshTimer;
pub use session::{
    EstimationFrame, EstimationSession, FrameRequestId, LightProbe, LightProbeOptions, ProbeError,
    ProbeGrant, ProbeResolver, ReflectionBinding, ReflectionFormat, SessionId,
};
pub use simulated::{SimulatedCapabilities, SimulatedFrame, SimulatedSession};
