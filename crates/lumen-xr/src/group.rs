//! Membership of light objects in the controller's scene group.

/// Light objects the controller can place in its group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightNode {
    /// Static sky/ground fill light.
    Hemisphere,
    /// Estimated spherical-harmonics ambient light.
    AmbientProbe,
    /// Estimated primary directional light.
    Directional,
}

/// Child list of the lighting group, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LightGroup {
    children: Vec<LightNode>,
}

impl LightGroup {
    /// Empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child. Adding a node that is already present is a no-op.
    pub fn add(&mut self, node: LightNode) {
        if !self.contains(node) {
            self.children.push(node);
        }
    }

    /// Remove a child. Returns `false` if it was not present.
    pub fn remove(&mut self, node: LightNode) -> bool {
        let before = self.children.len();
        self.children.retain(|child| *child != node);
        self.children.len() != before
    }

    /// Whether `node` is a child.
    pub fn contains(&self, node: LightNode) -> bool {
        self.children.contains(&node)
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[LightNode] {
        &self.children
    }
}
