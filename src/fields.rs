//! Flattening of [`GenerationData`] into placeholder values.

use crate::data::{Camera, Controller, GenerationData, HardwareCatalog, Lens, Light, Module, Workstation};
use chrono::{DateTime, Datelike, Local, NaiveDate};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Ordered placeholder name to value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    values: IndexMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Inserts `key` and `{prefix}_{key}`.
    fn insert_scoped(&mut self, prefix: &str, key: &str, value: impl Into<String>) {
        let value = value.into();
        self.values.insert(format!("{prefix}_{key}"), value.clone());
        self.values.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A new map holding `self`, with `fallback` filling keys `self` lacks
    /// or leaves empty.
    pub fn merged_over(&self, fallback: &FieldMap) -> FieldMap {
        let mut values = self.values.clone();
        for (k, v) in &fallback.values {
            let value = values.entry(k.clone()).or_default();
            if value.is_empty() {
                value.clone_from(v);
            }
        }
        FieldMap { values }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = FieldMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

fn format_number(value: Option<f64>) -> String {
    match value {
        Some(v) if v.fract() == 0.0 => format!("{}", v as i64),
        Some(v) => {
            let s = format!("{v:.3}");
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        None => String::new(),
    }
}

fn format_count(value: Option<u32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn parse_project_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(head, "%Y/%m/%d"))
        .ok()
}

/// Date shown in the deck: the project's own date, or the generation day.
pub fn project_date(data: &GenerationData, now: &DateTime<Local>) -> NaiveDate {
    parse_project_date(&data.project.date).unwrap_or_else(|| now.date_naive())
}

/// Project-level values shared by every slide of one generation request.
pub fn project_fields(data: &GenerationData, now: &DateTime<Local>) -> FieldMap {
    let project = &data.project;
    let date = project_date(data, now);
    let mut map = FieldMap::new();

    map.insert("project_id", project.id.as_str());
    map.insert("project_code", project.code.as_str());
    map.insert("project_name", project.name.as_str());
    map.insert("customer", project.customer.as_str());
    map.insert("customer_name", project.customer.as_str());
    map.insert("responsible", project.responsible.as_str());
    map.insert("sales_responsible", project.sales_responsible.as_str());
    map.insert("vision_responsible", project.vision_responsible.as_str());
    map.insert("product_process", project.product_process.as_str());
    map.insert("quality_strategy", project.quality_strategy.as_str());
    map.insert("project_description", project.description.as_str());

    map.insert("date", date.format("%Y-%m-%d").to_string());
    map.insert("date_cn", format!("{}年{:02}月{:02}日", date.year(), date.month(), date.day()));
    map.insert("year", date.year().to_string());
    map.insert("month", format!("{:02}", date.month()));
    map.insert("day", format!("{:02}", date.day()));
    map.insert("generated_at", now.format("%Y-%m-%d %H:%M:%S").to_string());

    map.insert("workstation_count", data.workstations.len().to_string());
    map.insert("module_count", data.module_count().to_string());
    map.insert("camera_count", data.hardware.cameras.len().to_string());
    map.insert("lens_count", data.hardware.lenses.len().to_string());
    map.insert("light_count", data.hardware.lights.len().to_string());
    map.insert("controller_count", data.hardware.controllers.len().to_string());
    map
}

/// Values of one workstation, as plain keys and `workstation_`-prefixed keys.
pub fn workstation_fields(workstation: &Workstation, index: usize) -> FieldMap {
    let mut map = FieldMap::new();
    let p = "workstation";

    map.insert_scoped(p, "index", (index + 1).to_string());
    map.insert_scoped(p, "id", workstation.id.as_str());
    map.insert_scoped(p, "code", workstation.code.as_str());
    map.insert_scoped(p, "name", workstation.name.as_str());
    map.insert_scoped(p, "line_type", workstation.line_type.as_str());
    map.insert_scoped(p, "cycle_time", format_number(workstation.cycle_time));
    map.insert_scoped(p, "product_size", workstation.product_size.as_str());
    map.insert_scoped(p, "shot_count", format_count(workstation.shot_count));
    map.insert_scoped(p, "acceptable_miss_rate", workstation.acceptable_miss_rate.as_str());
    map.insert_scoped(p, "acceptable_false_rate", workstation.acceptable_false_rate.as_str());
    map.insert_scoped(p, "risk_level", workstation.risk_level.as_str());
    map.insert_scoped(p, "description", workstation.description.as_str());
    map.insert_scoped(p, "module_count", workstation.modules.len().to_string());

    let layout = workstation.layout.clone().unwrap_or_default();
    map.insert_scoped(p, "conveyor_type", layout.conveyor_type);
    map.insert_scoped(p, "camera_count", format_count(layout.camera_count));
    map.insert_scoped(p, "lens_count", format_count(layout.lens_count));
    map.insert_scoped(p, "light_count", format_count(layout.light_count));
    map.insert_scoped(p, "camera_mounts", layout.camera_mounts.join(", "));

    let remark = workstation.annotation.as_ref().map(|a| a.remark.clone()).unwrap_or_default();
    map.insert_scoped(p, "annotation_remark", remark);
    map
}

fn hardware_label(brand: &str, model: &str) -> String {
    format!("{brand} {model}").trim().to_string()
}

/// Values of one module; referenced hardware is resolved against the catalog.
pub fn module_fields(module: &Module, index: usize, hardware: &HardwareCatalog) -> FieldMap {
    let mut map = FieldMap::new();
    let p = "module";

    map.insert_scoped(p, "index", (index + 1).to_string());
    map.insert_scoped(p, "id", module.id.as_str());
    map.insert_scoped(p, "name", module.name.as_str());
    map.insert_scoped(p, "type", module.module_type.as_str());
    map.insert_scoped(p, "description", module.description.as_str());
    map.insert_scoped(p, "trigger_type", module.trigger_type.as_str());
    map.insert_scoped(p, "processing_time", format_number(module.processing_time));
    map.insert_scoped(p, "roi_strategy", module.roi_strategy.as_str());

    let camera = hardware.cameras.iter().find(|c| !c.id.is_empty() && c.id == module.camera_id);
    let lens = hardware.lenses.iter().find(|l| !l.id.is_empty() && l.id == module.lens_id);
    let light = hardware.lights.iter().find(|l| !l.id.is_empty() && l.id == module.light_id);
    let controller = hardware
        .controllers
        .iter()
        .find(|c| !c.id.is_empty() && c.id == module.controller_id);

    map.insert_scoped(p, "camera", camera.map(|c| hardware_label(&c.brand, &c.model)).unwrap_or_default());
    map.insert_scoped(p, "lens", lens.map(|l| hardware_label(&l.brand, &l.model)).unwrap_or_default());
    map.insert_scoped(p, "light", light.map(|l| hardware_label(&l.brand, &l.model)).unwrap_or_default());
    map.insert_scoped(
        p,
        "controller",
        controller.map(|c| hardware_label(&c.brand, &c.model)).unwrap_or_default(),
    );
    map
}

pub fn camera_fields(camera: &Camera, index: usize) -> FieldMap {
    let mut map = FieldMap::new();
    let p = "camera";
    let (width, height) = camera
        .resolution_pixels()
        .map(|(w, h)| (w.to_string(), h.to_string()))
        .unwrap_or_default();

    map.insert_scoped(p, "index", (index + 1).to_string());
    map.insert_scoped(p, "id", camera.id.as_str());
    map.insert_scoped(p, "brand", camera.brand.as_str());
    map.insert_scoped(p, "model", camera.model.as_str());
    map.insert_scoped(p, "name", hardware_label(&camera.brand, &camera.model));
    map.insert_scoped(p, "resolution", camera.resolution.as_str());
    map.insert_scoped(p, "resolution_width", width);
    map.insert_scoped(p, "resolution_height", height);
    map.insert_scoped(p, "frame_rate", format_number(camera.frame_rate));
    map.insert_scoped(p, "interface", camera.interface.as_str());
    map.insert_scoped(p, "sensor_size", camera.sensor_size.as_str());
    map.insert_scoped(p, "pixel_size", format_number(camera.pixel_size));
    map
}

pub fn lens_fields(lens: &Lens, index: usize) -> FieldMap {
    let mut map = FieldMap::new();
    let p = "lens";
    map.insert_scoped(p, "index", (index + 1).to_string());
    map.insert_scoped(p, "id", lens.id.as_str());
    map.insert_scoped(p, "brand", lens.brand.as_str());
    map.insert_scoped(p, "model", lens.model.as_str());
    map.insert_scoped(p, "name", hardware_label(&lens.brand, &lens.model));
    map.insert_scoped(p, "focal_length", lens.focal_length.as_str());
    map.insert_scoped(p, "aperture", lens.aperture.as_str());
    map.insert_scoped(p, "mount", lens.mount.as_str());
    map
}

pub fn light_fields(light: &Light, index: usize) -> FieldMap {
    let mut map = FieldMap::new();
    let p = "light";
    map.insert_scoped(p, "index", (index + 1).to_string());
    map.insert_scoped(p, "id", light.id.as_str());
    map.insert_scoped(p, "brand", light.brand.as_str());
    map.insert_scoped(p, "model", light.model.as_str());
    map.insert_scoped(p, "name", hardware_label(&light.brand, &light.model));
    map.insert_scoped(p, "type", light.light_type.as_str());
    map.insert_scoped(p, "color", light.color.as_str());
    map.insert_scoped(p, "power", light.power.as_str());
    map
}

pub fn controller_fields(controller: &Controller, index: usize) -> FieldMap {
    let mut map = FieldMap::new();
    let p = "controller";
    map.insert_scoped(p, "index", (index + 1).to_string());
    map.insert_scoped(p, "id", controller.id.as_str());
    map.insert_scoped(p, "brand", controller.brand.as_str());
    map.insert_scoped(p, "model", controller.model.as_str());
    map.insert_scoped(p, "name", hardware_label(&controller.brand, &controller.model));
    map.insert_scoped(p, "cpu", controller.cpu.as_str());
    map.insert_scoped(p, "gpu", controller.gpu.as_str());
    map.insert_scoped(p, "memory", controller.memory.as_str());
    map.insert_scoped(p, "storage", controller.storage.as_str());
    map.insert_scoped(p, "performance", controller.performance.as_str());
    map
}

/// Logical image slots addressable with `{{img:slot}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSlot {
    FrontView,
    SideView,
    TopView,
    ProductSnapshot,
    ModuleSchematic,
}

impl ImageSlot {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "front_view" => Some(Self::FrontView),
            "side_view" => Some(Self::SideView),
            "top_view" => Some(Self::TopView),
            "product_snapshot" => Some(Self::ProductSnapshot),
            "module_schematic" | "schematic" => Some(Self::ModuleSchematic),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::FrontView => "front_view",
            Self::SideView => "side_view",
            Self::TopView => "top_view",
            Self::ProductSnapshot => "product_snapshot",
            Self::ModuleSchematic => "module_schematic",
        }
    }
}

/// Position of `module` among the modules of all workstations, in data order.
pub fn module_ordinal(data: &GenerationData, module: &Module) -> Option<usize> {
    data.workstations
        .iter()
        .flat_map(|w| w.modules.iter())
        .position(|m| std::ptr::eq(m, module))
}

/// Image URLs available to the slides being transformed.
#[derive(Debug, Clone, Default)]
pub struct ImageScope {
    urls: HashMap<ImageSlot, String>,
    /// Schematic URL per module ordinal, empty where a module has none.
    module_schematics: Vec<String>,
}

impl ImageScope {
    pub fn set(&mut self, slot: ImageSlot, url: &str) {
        if !url.trim().is_empty() {
            self.urls.insert(slot, url.trim().to_string());
        }
    }

    pub fn url(&self, slot: ImageSlot) -> Option<&str> {
        self.urls.get(&slot).map(String::as_str)
    }

    pub fn set_module_schematics(&mut self, urls: Vec<String>) {
        self.module_schematics = urls.into_iter().map(|u| u.trim().to_string()).collect();
    }

    /// Schematic of the module with the given [`module_ordinal`].
    pub fn module_schematic(&self, ordinal: usize) -> Option<&str> {
        self.module_schematics
            .get(ordinal)
            .map(String::as_str)
            .filter(|u| !u.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.module_schematics.iter().all(String::is_empty)
    }

    /// Images of one workstation. Module-pinned schematics resolve against
    /// every module in `data`.
    pub fn for_workstation(data: &GenerationData, workstation: &Workstation) -> Self {
        let mut scope = Self::default();
        if let Some(layout) = &workstation.layout {
            scope.set(ImageSlot::FrontView, &layout.front_view_url);
            scope.set(ImageSlot::SideView, &layout.side_view_url);
            scope.set(ImageSlot::TopView, &layout.top_view_url);
        }

        let snapshot = workstation
            .annotation
            .as_ref()
            .map(|a| a.snapshot_url.clone())
            .filter(|u| !u.trim().is_empty())
            .or_else(|| {
                workstation
                    .product_asset
                    .as_ref()
                    .and_then(|a| a.preview_images.first().cloned())
            });
        if let Some(url) = snapshot {
            scope.set(ImageSlot::ProductSnapshot, &url);
        }

        if let Some(module) = workstation.modules.iter().find(|m| !m.schematic_url.trim().is_empty()) {
            scope.set(ImageSlot::ModuleSchematic, &module.schematic_url);
        }
        scope.set_module_schematics(all_module_schematics(data));
        scope
    }

    /// Deck-level slides use the images of the first workstation.
    pub fn for_deck(data: &GenerationData) -> Self {
        match data.workstations.first() {
            Some(first) => Self::for_workstation(data, first),
            None => {
                let mut scope = Self::default();
                scope.set_module_schematics(all_module_schematics(data));
                scope
            }
        }
    }
}

fn all_module_schematics(data: &GenerationData) -> Vec<String> {
    data.workstations
        .iter()
        .flat_map(|w| w.modules.iter())
        .map(|m| m.schematic_url.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Layout, Project};
    use chrono::TimeZone;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 10, 30, 0).unwrap()
    }

    #[test]
    fn test_project_fields_date_components() {
        let data = GenerationData {
            project: Project { name: "AOI".into(), date: "2023-11-02T08:00:00Z".into(), ..Default::default() },
            ..Default::default()
        };
        let map = project_fields(&data, &now());
        assert_eq!(map.get("year"), Some("2023"));
        assert_eq!(map.get("month"), Some("11"));
        assert_eq!(map.get("day"), Some("02"));
        assert_eq!(map.get("date_cn"), Some("2023年11月02日"));
        assert_eq!(map.get("generated_at"), Some("2024-03-09 10:30:00"));
        assert_eq!(map.get("workstation_count"), Some("0"));
    }

    #[test]
    fn test_project_date_falls_back_to_now() {
        let map = project_fields(&GenerationData::default(), &now());
        assert_eq!(map.get("date"), Some("2024-03-09"));
    }

    #[test]
    fn test_workstation_fields_are_scoped_and_plain() {
        let ws = Workstation { name: "OP20".into(), cycle_time: Some(2.5), ..Default::default() };
        let map = workstation_fields(&ws, 1);
        assert_eq!(map.get("name"), Some("OP20"));
        assert_eq!(map.get("workstation_name"), Some("OP20"));
        assert_eq!(map.get("index"), Some("2"));
        assert_eq!(map.get("cycle_time"), Some("2.5"));
    }

    #[test]
    fn test_merged_over_prefers_own_values() {
        let own: FieldMap = [("name", "module")].into_iter().collect();
        let parent: FieldMap = [("name", "station"), ("code", "S1")].into_iter().collect();
        let merged = own.merged_over(&parent);
        assert_eq!(merged.get("name"), Some("module"));
        assert_eq!(merged.get("code"), Some("S1"));
    }

    #[test]
    fn test_image_scope_for_workstation() {
        let ws = Workstation {
            layout: Some(Layout { front_view_url: "https://img/front.png".into(), ..Default::default() }),
            modules: vec![Module { schematic_url: "https://img/m1.png".into(), ..Default::default() }],
            ..Default::default()
        };
        let data = GenerationData { workstations: vec![ws], ..Default::default() };
        let scope = ImageScope::for_workstation(&data, &data.workstations[0]);
        assert_eq!(scope.url(ImageSlot::FrontView), Some("https://img/front.png"));
        assert_eq!(scope.url(ImageSlot::SideView), None);
        assert_eq!(scope.url(ImageSlot::ModuleSchematic), Some("https://img/m1.png"));
        assert_eq!(ImageSlot::from_name("schematic"), Some(ImageSlot::ModuleSchematic));
    }

    #[test]
    fn test_module_schematics_by_ordinal() {
        let module = |url: &str| Module { schematic_url: url.into(), ..Default::default() };
        let data = GenerationData {
            workstations: vec![
                Workstation { modules: vec![module("https://img/a.png"), module("")], ..Default::default() },
                Workstation { modules: vec![module("https://img/c.png")], ..Default::default() },
            ],
            ..Default::default()
        };
        let scope = ImageScope::for_deck(&data);
        assert_eq!(scope.module_schematic(0), Some("https://img/a.png"));
        assert_eq!(scope.module_schematic(1), None);
        assert_eq!(scope.module_schematic(2), Some("https://img/c.png"));
        assert_eq!(scope.module_schematic(3), None);
        assert_eq!(module_ordinal(&data, &data.workstations[1].modules[0]), Some(2));
        assert_eq!(module_ordinal(&data, &module("https://img/c.png")), None);
    }

    #[test]
    fn test_empty_workstation_values_fall_back_to_project() {
        let data = GenerationData {
            hardware: HardwareCatalog { cameras: vec![Camera::default(), Camera::default()], ..Default::default() },
            workstations: vec![Workstation { name: "OP10".into(), ..Default::default() }],
            ..Default::default()
        };
        let project = project_fields(&data, &now());
        let merged = workstation_fields(&data.workstations[0], 0).merged_over(&project);
        assert_eq!(project.get("camera_count"), Some("2"));
        assert_eq!(merged.get("camera_count"), Some("2"));
        assert_eq!(merged.get("workstation_camera_count"), Some(""));
        assert_eq!(merged.get("name"), Some("OP10"));
    }
}
