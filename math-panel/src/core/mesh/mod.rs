//! Panel mesh: triangles, surfaces and generators

pub mod generators;
pub mod panel;
pub mod surface;

pub use generators::{FlapSpec, WingSpec, generate_icosphere, generate_wing};
pub use panel::{Panel, PanelSide};
pub use surface::{
    ControlSurface, PanelMesh, ReferenceDimensions, Strip, Surface, SurfaceKind, TrailingEdge,
};
