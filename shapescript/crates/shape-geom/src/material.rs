//! Surface materials and textures.

use crate::math::Color;

/// Where a texture's pixels come from. The core never decodes images; it
/// records the reference and hands it to the host.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    /// A file reference, as written in the program plus the resolved
    /// location when the delegate provided one.
    File {
        name: String,
        resolved: Option<std::path::PathBuf>,
    },
    /// Raw encoded image bytes supplied by the host.
    Data(std::sync::Arc<[u8]>),
}

/// A texture reference with an intensity multiplier.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub source: TextureSource,
    pub intensity: f64,
}

impl Texture {
    pub fn file(name: impl Into<String>, resolved: Option<std::path::PathBuf>) -> Self {
        Self {
            source: TextureSource::File {
                name: name.into(),
                resolved,
            },
            intensity: 1.0,
        }
    }

    /// The file path as written, for string conversion.
    pub fn name(&self) -> Option<&str> {
        match &self.source {
            TextureSource::File { name, .. } => Some(name),
            TextureSource::Data(_) => None,
        }
    }
}

/// The material state a geometry node freezes when it is emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Uniform albedo colour; `None` leaves the host default.
    pub color: Option<Color>,
    /// Albedo texture; set through the `texture` command.
    pub texture: Option<Texture>,
    /// Normal map reference.
    pub normals: Option<Texture>,
    pub opacity: f64,
    pub metallicity: f64,
    pub roughness: f64,
    pub glow: f64,
}

impl Material {
    pub const DEFAULT_OPACITY: f64 = 1.0;

    /// Whether the material differs from the default in a way that is
    /// purely a uniform override (colour/texture), i.e. does not affect
    /// the built geometry.
    pub fn is_uniform_override(&self) -> bool {
        self.color.is_some() || self.texture.is_some()
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            color: None,
            texture: None,
            normals: None,
            opacity: Self::DEFAULT_OPACITY,
            metallicity: 0.0,
            roughness: 0.5,
            glow: 0.0,
        }
    }
}
