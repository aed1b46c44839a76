//! WASM bindings for building and merging KMZ files in the browser.
//!
//! Placemarks cross the boundary as plain values; ids are handed out as
//! `u64` and icons as catalog id strings.

use wasm_bindgen::prelude::*;

use crate::batch::BatchReport;
use crate::export::{KmzExporter, export_file_name};
use crate::kml::{IconCategory, parse_raw_placemarks};
use crate::kmz::unpack;
use crate::merge::{MergeCoordinator, ParsedSource, merge_file_name, parse_for_merge};
use crate::model::{PlacemarkId, PlacemarkList, PlacemarkRecord};
use crate::util::today;

/// Initialize panic hook for better error messages in the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: crate::Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn icon_from_id(id: &str) -> IconCategory {
    IconCategory::from_id(id).unwrap_or_else(|| {
        log::warn!(
            "unknown icon '{id}' ({}), using pushpin",
            IconCategory::folder_label_for_id(id)
        );
        IconCategory::default()
    })
}

fn record(
    name: String,
    latitude: f64,
    longitude: f64,
    description: String,
    icon: &str,
    image: Option<Vec<u8>>,
) -> PlacemarkRecord {
    let mut record = PlacemarkRecord::new(name, latitude, longitude)
        .with_description(description)
        .with_icon(icon_from_id(icon));
    record.image = image;
    record
}

/// Working placemark list that builds a KMZ on demand.
#[wasm_bindgen]
pub struct KmzBuilder {
    project: String,
    list: PlacemarkList,
}

#[wasm_bindgen]
impl KmzBuilder {
    #[wasm_bindgen(constructor)]
    pub fn new(project: String) -> KmzBuilder {
        KmzBuilder {
            project,
            list: PlacemarkList::new(),
        }
    }

    /// Add a placemark and return its id.
    #[wasm_bindgen(js_name = addPlacemark)]
    pub fn add_placemark(
        &mut self,
        name: String,
        latitude: f64,
        longitude: f64,
        description: String,
        icon: &str,
        image: Option<Vec<u8>>,
    ) -> u64 {
        self.list
            .push(record(name, latitude, longitude, description, icon, image))
            .get()
    }

    /// Replace the placemark with `id`. Returns false if it does not exist.
    #[wasm_bindgen(js_name = replacePlacemark)]
    #[allow(clippy::too_many_arguments)]
    pub fn replace_placemark(
        &mut self,
        id: u64,
        name: String,
        latitude: f64,
        longitude: f64,
        description: String,
        icon: &str,
        image: Option<Vec<u8>>,
    ) -> bool {
        let Some(id) = self.find(id) else {
            return false;
        };
        self.list
            .replace(id, record(name, latitude, longitude, description, icon, image))
            .is_some()
    }

    #[wasm_bindgen(js_name = removePlacemark)]
    pub fn remove_placemark(&mut self, id: u64) -> bool {
        self.find(id)
            .and_then(|id| self.list.remove(id))
            .is_some()
    }

    #[wasm_bindgen(getter)]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[wasm_bindgen(js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Suggested download name, dated today.
    #[wasm_bindgen(js_name = fileName)]
    pub fn file_name(&self, custom: Option<String>) -> String {
        export_file_name(&self.project, custom.as_deref(), today())
    }

    /// Serialize and pack every placemark.
    pub fn build(&self) -> Result<Vec<u8>, JsValue> {
        KmzExporter::new()
            .export_to_vec(self.list.records(), &self.project)
            .map_err(js_error)
    }

    fn find(&self, raw: u64) -> Option<PlacemarkId> {
        self.list
            .records()
            .iter()
            .map(|r| r.id)
            .find(|id| id.get() == raw)
    }
}

/// Collects KMZ sources and merges them into one archive.
#[wasm_bindgen]
pub struct KmzMerger {
    sources: Vec<ParsedSource>,
    report: BatchReport,
}

impl Default for KmzMerger {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl KmzMerger {
    #[wasm_bindgen(constructor)]
    pub fn new() -> KmzMerger {
        KmzMerger {
            sources: Vec::new(),
            report: BatchReport::new(),
        }
    }

    /// Parse and queue one archive. A bad archive is recorded and false is returned.
    #[wasm_bindgen(js_name = addSource)]
    pub fn add_source(&mut self, name: String, data: &[u8]) -> bool {
        match parse_for_merge(data, &name) {
            Ok(source) => {
                self.sources.push(source);
                self.report.record_success();
                true
            }
            Err(e) => {
                self.report.record_failure(name, &e);
                false
            }
        }
    }

    /// Outcome of every `addSource` call, one line per problem file.
    pub fn report(&self) -> String {
        let mut lines = vec![self.report.to_string()];
        lines.extend(self.report.issues().map(ToString::to_string));
        lines.join("\n")
    }

    #[wasm_bindgen(js_name = fileName)]
    pub fn file_name(&self, output_name: &str) -> String {
        merge_file_name(output_name)
    }

    /// Merge every queued source.
    pub fn finish(&self, output_name: &str) -> Result<Vec<u8>, JsValue> {
        MergeCoordinator::new()
            .merge_to_vec(&self.sources, output_name)
            .map_err(js_error)
    }
}

/// Number of placemarks in a KMZ, including ones without coordinates.
#[wasm_bindgen(js_name = countPlacemarks)]
pub fn count_placemarks(data: &[u8]) -> Result<usize, JsValue> {
    let archive = unpack(data).map_err(js_error)?;
    parse_raw_placemarks(&archive.kml)
        .map(|placemarks| placemarks.len())
        .map_err(js_error)
}
