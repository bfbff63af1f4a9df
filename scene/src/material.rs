//! Shading graphs as supplied by the host.
//!
//! A material is a small node graph: one [`ShaderNodeKind::MaterialOutput`]
//! node whose `Surface` input links to the surface shader node. Every other
//! input either holds a literal constant or links to an upstream node.

/// Unique identifier for materials.
///
/// Material IDs are assigned sequentially by the Scene starting from 0.
pub type MaterialId = u32;

/// Index of a node inside its [`ShaderGraph`].
pub type ShaderNodeId = usize;

/// Well-known input slot names.
pub mod inputs {
    pub const SURFACE: &str = "Surface";
    pub const BASE_COLOR: &str = "Base Color";
    pub const COLOR: &str = "Color";
    pub const METALLIC: &str = "Metallic";
    pub const ROUGHNESS: &str = "Roughness";
    pub const IOR: &str = "IOR";
    pub const NORMAL: &str = "Normal";
    pub const EMISSION: &str = "Emission";
    pub const EMISSION_STRENGTH: &str = "Emission Strength";
}

/// A literal value held by an unlinked input slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShaderValue {
    Float(f32),
    Rgb([f32; 3]),
    Rgba([f32; 4]),
    Vector([f32; 3]),
}

impl ShaderValue {
    pub fn as_float(&self) -> Option<f32> {
        match *self {
            ShaderValue::Float(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the colour channels, dropping alpha.
    pub fn as_rgb(&self) -> Option<[f32; 3]> {
        match *self {
            ShaderValue::Rgb(rgb) => Some(rgb),
            ShaderValue::Rgba([r, g, b, _]) => Some([r, g, b]),
            _ => None,
        }
    }
}

/// Where an input slot gets its value from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Constant(ShaderValue),
    Link(ShaderNodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderInput {
    pub name: String,
    pub source: InputSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderNodeKind {
    MaterialOutput,
    /// Standard PBR surface.
    PrincipledBsdf,
    /// Lambertian surface.
    DiffuseBsdf,
    /// Specular reflection; only the ideal (zero roughness) case is exportable.
    GlossyBsdf,
    GlassBsdf,
    /// Any node type the exporter has no mapping for.
    Other(String),
}

impl ShaderNodeKind {
    pub fn name(&self) -> &str {
        match self {
            ShaderNodeKind::MaterialOutput => "MaterialOutput",
            ShaderNodeKind::PrincipledBsdf => "PrincipledBsdf",
            ShaderNodeKind::DiffuseBsdf => "DiffuseBsdf",
            ShaderNodeKind::GlossyBsdf => "GlossyBsdf",
            ShaderNodeKind::GlassBsdf => "GlassBsdf",
            ShaderNodeKind::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderNode {
    pub kind: ShaderNodeKind,
    pub inputs: Vec<ShaderInput>,
}

impl ShaderNode {
    pub fn new(kind: ShaderNodeKind) -> Self {
        Self {
            kind,
            inputs: Vec::new(),
        }
    }

    pub fn principled() -> Self {
        Self::new(ShaderNodeKind::PrincipledBsdf)
    }

    pub fn diffuse() -> Self {
        Self::new(ShaderNodeKind::DiffuseBsdf)
    }

    pub fn glossy() -> Self {
        Self::new(ShaderNodeKind::GlossyBsdf)
    }

    pub fn glass() -> Self {
        Self::new(ShaderNodeKind::GlassBsdf)
    }

    /// Sets an input to a constant, replacing any previous source for that slot.
    pub fn with_constant(mut self, name: &str, value: ShaderValue) -> Self {
        self.set_input(name, InputSource::Constant(value));
        self
    }

    pub fn with_float(self, name: &str, value: f32) -> Self {
        self.with_constant(name, ShaderValue::Float(value))
    }

    pub fn with_rgb(self, name: &str, rgb: [f32; 3]) -> Self {
        self.with_constant(name, ShaderValue::Rgb(rgb))
    }

    /// Links an input to the output of an upstream node.
    pub fn with_link(mut self, name: &str, node: ShaderNodeId) -> Self {
        self.set_input(name, InputSource::Link(node));
        self
    }

    pub fn set_input(&mut self, name: &str, source: InputSource) {
        match self.inputs.iter_mut().find(|input| input.name == name) {
            Some(input) => input.source = source,
            None => self.inputs.push(ShaderInput {
                name: name.to_string(),
                source,
            }),
        }
    }

    pub fn input(&self, name: &str) -> Option<&ShaderInput> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderGraph {
    pub nodes: Vec<ShaderNode>,
}

impl ShaderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the common two-node graph: `surface` feeding a material output.
    pub fn from_surface(surface: ShaderNode) -> Self {
        let mut graph = Self::new();
        let surface_id = graph.add_node(surface);
        graph.add_node(
            ShaderNode::new(ShaderNodeKind::MaterialOutput).with_link(inputs::SURFACE, surface_id),
        );
        graph
    }

    pub fn add_node(&mut self, node: ShaderNode) -> ShaderNodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn node(&self, id: ShaderNodeId) -> Option<&ShaderNode> {
        self.nodes.get(id)
    }

    /// Iterates over all material output nodes with their ids.
    pub fn output_nodes(&self) -> impl Iterator<Item = (ShaderNodeId, &ShaderNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == ShaderNodeKind::MaterialOutput)
    }
}

/// A named material backed by a shading graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub graph: ShaderGraph,
}

impl Material {
    pub fn new(name: impl Into<String>, graph: ShaderGraph) -> Self {
        Self {
            name: name.into(),
            graph,
        }
    }

    pub fn from_surface(name: impl Into<String>, surface: ShaderNode) -> Self {
        Self::new(name, ShaderGraph::from_surface(surface))
    }

    pub fn lambert(name: impl Into<String>, color: [f32; 3]) -> Self {
        Self::from_surface(name, ShaderNode::diffuse().with_rgb(inputs::COLOR, color))
    }

    pub fn glass(name: impl Into<String>, ior: f32) -> Self {
        Self::from_surface(name, ShaderNode::glass().with_float(inputs::IOR, ior))
    }

    pub fn mirror(name: impl Into<String>) -> Self {
        Self::from_surface(name, ShaderNode::glossy().with_float(inputs::ROUGHNESS, 0.0))
    }
}
