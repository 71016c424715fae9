pub mod config;
pub mod loader;
pub mod registry;
pub mod render;
pub mod sequencer;
pub mod session;

pub use config::{ActionConfig, AnimationSource, Convention, StageConfig, Tuning};
pub use loader::{ActionReport, ActionRuntime, LoadReport, LoadedAssets, load_assets};
pub use registry::{ActionId, ActionTable};
pub use render::{Camera, HeadlessRenderer, Renderer, SceneFrame};
pub use sequencer::{Channels, Fades, Sequencer, SequencerState};
pub use session::{FrameClock, Lifecycle, StageSession, StageSnapshot};
