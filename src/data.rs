//! The denormalized data tree a deck is generated from.
//!
//! Every record is deserialized leniently: missing fields fall back to
//! empty values so partially filled projects still render.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationData {
    pub project: Project,
    pub workstations: Vec<Workstation>,
    pub hardware: HardwareCatalog,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: String,
    pub code: String,
    pub name: String,
    pub customer: String,
    /// ISO date (`YYYY-MM-DD`); the generation date is used when empty.
    pub date: String,
    pub responsible: String,
    pub sales_responsible: String,
    pub vision_responsible: String,
    pub product_process: String,
    pub quality_strategy: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Workstation {
    pub id: String,
    pub code: String,
    pub name: String,
    pub line_type: String,
    pub cycle_time: Option<f64>,
    pub product_size: String,
    pub shot_count: Option<u32>,
    pub acceptable_miss_rate: String,
    pub acceptable_false_rate: String,
    pub risk_level: String,
    pub description: String,
    pub modules: Vec<Module>,
    pub layout: Option<Layout>,
    pub annotation: Option<ProductAnnotation>,
    pub product_asset: Option<ProductAsset>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Module {
    pub id: String,
    pub name: String,
    pub module_type: String,
    pub description: String,
    pub trigger_type: String,
    pub processing_time: Option<f64>,
    pub roi_strategy: String,
    pub camera_id: String,
    pub lens_id: String,
    pub light_id: String,
    pub controller_id: String,
    pub schematic_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub conveyor_type: String,
    pub camera_count: Option<u32>,
    pub lens_count: Option<u32>,
    pub light_count: Option<u32>,
    pub camera_mounts: Vec<String>,
    pub front_view_url: String,
    pub side_view_url: String,
    pub top_view_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductAnnotation {
    pub snapshot_url: String,
    pub remark: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductAsset {
    pub model_file_url: String,
    pub preview_images: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareCatalog {
    pub cameras: Vec<Camera>,
    pub lenses: Vec<Lens>,
    pub lights: Vec<Light>,
    pub controllers: Vec<Controller>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub resolution: String,
    pub frame_rate: Option<f64>,
    pub interface: String,
    pub sensor_size: String,
    pub pixel_size: Option<f64>,
    pub image_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Lens {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub focal_length: String,
    pub aperture: String,
    pub mount: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub light_type: String,
    pub color: String,
    pub power: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Controller {
    pub id: String,
    pub brand: String,
    pub model: String,
    pub cpu: String,
    pub gpu: String,
    pub memory: String,
    pub storage: String,
    pub performance: String,
    pub image_url: String,
}

impl GenerationData {
    pub fn module_count(&self) -> usize {
        self.workstations.iter().map(|w| w.modules.len()).sum()
    }
}

impl Camera {
    /// Pixel dimensions parsed from [`Camera::resolution`].
    pub fn resolution_pixels(&self) -> Option<(u32, u32)> {
        parse_resolution(&self.resolution)
    }
}

/// Parses a camera resolution into `(width, height)` pixels.
///
/// Accepts explicit dimensions (`2448x2048`, `2448×2048`, `2448*2048`) and
/// megapixel ratings (`5MP`, `12 MP`, `500万`), the latter expanded to a 4:3
/// sensor whose pixel count matches the rating.
pub fn parse_resolution(value: &str) -> Option<(u32, u32)> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let separators = ['x', 'X', '×', '*'];
    if let Some((w, h)) = value.split_once(|c| separators.contains(&c)) {
        let w = w.trim().parse::<u32>().ok()?;
        let h = h.trim().parse::<u32>().ok()?;
        return Some((w, h));
    }

    let lower = value.to_lowercase();
    let megapixels = if let Some(mp) = lower.strip_suffix("mp") {
        mp.trim().parse::<f64>().ok()?
    } else if let Some(wan) = lower.strip_suffix("万像素").or_else(|| lower.strip_suffix('万')) {
        wan.trim().parse::<f64>().ok()? / 100.0
    } else {
        return None;
    };
    if megapixels <= 0.0 {
        return None;
    }

    let pixels = megapixels * 1_000_000.0;
    let width = (pixels * 4.0 / 3.0).sqrt();
    let height = width * 3.0 / 4.0;
    Some((width.round() as u32, height.round() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_explicit_resolution() {
        assert_eq!(parse_resolution("2448x2048"), Some((2448, 2048)));
        assert_eq!(parse_resolution(" 1920 * 1080 "), Some((1920, 1080)));
        assert_eq!(parse_resolution("4096×3000"), Some((4096, 3000)));
    }

    #[test]
    fn test_parse_megapixel_resolution() {
        let (w, h) = parse_resolution("5MP").unwrap();
        let product = w as f64 * h as f64;
        assert!((product - 5_000_000.0).abs() / 5_000_000.0 < 0.001);
        assert!(((w as f64 / h as f64) - 4.0 / 3.0).abs() < 0.01);

        let (w2, h2) = parse_resolution("500万").unwrap();
        assert_eq!((w2, h2), (w, h));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_resolution(""), None);
        assert_eq!(parse_resolution("high"), None);
        assert_eq!(parse_resolution("0MP"), None);
    }

    #[test]
    fn test_lenient_deserialization() {
        let data: GenerationData = serde_json::from_str(
            r#"{"project":{"name":"Line 3"},"workstations":[{"name":"OP10","modules":[{"name":"Scan"}]}]}"#,
        )
        .unwrap();
        assert_eq!(data.project.name, "Line 3");
        assert_eq!(data.module_count(), 1);
        assert!(data.hardware.cameras.is_empty());
    }
}
