//! Marker source seam
//!
//! The build orchestrator owns the marker array; the processor reads it,
//! produces a replacement, and writes it back. Each pattern in a generator
//! asset sees the previous pattern's output.

use gridscene::Marker;

/// Owner of the scene's marker array
pub trait MarkerSource {
    /// Current marker array
    fn get_markers(&self) -> Vec<Marker>;

    /// Replace the marker array
    fn set_markers(&mut self, markers: Vec<Marker>);
}

/// In-memory marker source
#[derive(Debug, Clone, Default)]
pub struct VecMarkerSource {
    markers: Vec<Marker>,
}

impl VecMarkerSource {
    /// Create a source seeded with `markers`
    pub fn new(markers: Vec<Marker>) -> Self {
        VecMarkerSource { markers }
    }

    /// Borrow the current markers
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

impl MarkerSource for VecMarkerSource {
    fn get_markers(&self) -> Vec<Marker> {
        self.markers.clone()
    }

    fn set_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
    }
}
