//! Replay script format
//!
//! A script is a JSON document describing the stage contents and a list of
//! pointer events to feed through the dispatcher, in order.

use kurbo::{Affine, Rect};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use touchstage_core::dispatcher::PointerEvent;
use touchstage_core::element::{Element, ElementRole, ImageContent};
use touchstage_core::stage::Stage;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub events: Vec<PointerEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSpec {
    pub name: String,
    #[serde(default)]
    pub role: Option<ElementRole>,
    pub rect: Rect,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub transform: Option<Affine>,
    #[serde(default)]
    pub image: Option<ImageSpec>,
}

/// Raster content for an element
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ImageSpec {
    /// PNG (or any format `image` decodes), relative to the script's directory
    File {
        path: PathBuf,
        #[serde(default = "default_readable")]
        readable: bool,
    },
    /// Uniform image of the given size and alpha
    Solid {
        width: u32,
        height: u32,
        alpha: u8,
        #[serde(default = "default_readable")]
        readable: bool,
    },
}

fn default_readable() -> bool {
    true
}

impl Script {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&contents)?)
    }

    /// Build the stage described by the script
    ///
    /// Image paths are resolved against `base_dir`.
    pub fn build_stage(&self, base_dir: &Path) -> Result<Stage, Box<dyn std::error::Error>> {
        let mut stage = Stage::new();
        for spec in &self.elements {
            let mut element = Element::new(spec.name.clone(), spec.rect)
                .with_role(spec.role.unwrap_or(ElementRole::Draggable))
                .with_z_index(spec.z_index);
            if let Some(transform) = spec.transform {
                element = element.with_transform(transform);
            }
            if let Some(image) = &spec.image {
                element = element.with_image(load_image(image, base_dir)?);
            }
            stage.add_element(element);
        }
        Ok(stage)
    }
}

fn load_image(spec: &ImageSpec, base_dir: &Path) -> Result<ImageContent, Box<dyn std::error::Error>> {
    match spec {
        ImageSpec::File { path, readable } => {
            let full_path = base_dir.join(path);
            log::debug!("Decoding image {:?}", full_path);
            let rgba = image::open(&full_path)?.to_rgba8();
            let (width, height) = rgba.dimensions();
            Ok(ImageContent::from_rgba8(width, height, rgba.into_raw())?.with_readable(*readable))
        }
        ImageSpec::Solid {
            width,
            height,
            alpha,
            readable,
        } => Ok(ImageContent::solid(*width, *height, *alpha)?.with_readable(*readable)),
    }
}
