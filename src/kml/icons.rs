//! Icon catalog: the closed set of marker categories.
//!
//! One ordered table serves both directions. Serialization looks a category
//! up directly; detection scans the table in order and returns the first
//! category whose keyword occurs anywhere in the marker URL.
//!
//! Detection is substring based and therefore ambiguous when a URL contains
//! keywords of more than one category. Table order decides in that case.

use std::fmt;

/// Marker category of a placemark. Also the folder key when grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IconCategory {
    #[default]
    Pushpin,
    Bird,
    House,
    Tree,
    Star,
    Flag,
    Circle,
    Target,
    Square,
    Triangle,
    Camera,
}

/// Static description of one category.
#[derive(Debug, Clone, Copy)]
pub struct IconDescriptor {
    pub category: IconCategory,
    /// Stable identifier used in JSON and the browser surface.
    pub id: &'static str,
    /// Folder name in generated documents.
    pub display_name: &'static str,
    pub marker_url: &'static str,
    /// URL substrings that identify this category, in priority order.
    pub keywords: &'static [&'static str],
}

/// Folder label for ids outside the catalog.
pub const OTHERS_LABEL: &str = "Others";

/// The catalog, in detection order.
pub const CATALOG: &[IconDescriptor] = &[
    IconDescriptor {
        category: IconCategory::Bird,
        id: "bird",
        display_name: "Birds",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/campground.png",
        keywords: &["campground", "icon56"],
    },
    IconDescriptor {
        category: IconCategory::House,
        id: "house",
        display_name: "Houses",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/ranger_station.png",
        keywords: &["ranger_station"],
    },
    IconDescriptor {
        category: IconCategory::Tree,
        id: "tree",
        display_name: "Trees",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/parks.png",
        keywords: &["parks", "icon50"],
    },
    IconDescriptor {
        category: IconCategory::Star,
        id: "star",
        display_name: "Stars",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/star.png",
        keywords: &["star"],
    },
    IconDescriptor {
        category: IconCategory::Flag,
        id: "flag",
        display_name: "Flags",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/flag.png",
        keywords: &["flag"],
    },
    IconDescriptor {
        category: IconCategory::Circle,
        id: "placemark_circle",
        display_name: "Circles",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/placemark_circle.png",
        keywords: &["circle"],
    },
    IconDescriptor {
        category: IconCategory::Target,
        id: "target",
        display_name: "Targets",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/target.png",
        keywords: &["target"],
    },
    IconDescriptor {
        category: IconCategory::Square,
        id: "square",
        display_name: "Squares",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/placemark_square.png",
        keywords: &["square"],
    },
    IconDescriptor {
        category: IconCategory::Triangle,
        id: "triangle",
        display_name: "Triangles",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/triangle.png",
        keywords: &["triangle"],
    },
    IconDescriptor {
        category: IconCategory::Camera,
        id: "camera",
        display_name: "Cameras",
        marker_url: "http://maps.google.com/mapfiles/kml/shapes/camera.png",
        keywords: &["camera"],
    },
    IconDescriptor {
        category: IconCategory::Pushpin,
        id: "pushpin",
        display_name: "Pins",
        marker_url: "http://maps.google.com/mapfiles/kml/pushpin/ylw-pushpin.png",
        keywords: &["pushpin"],
    },
];

impl IconCategory {
    pub fn descriptor(self) -> &'static IconDescriptor {
        // Every variant has exactly one catalog row; the pushpin row is last.
        CATALOG
            .iter()
            .find(|d| d.category == self)
            .unwrap_or(&CATALOG[CATALOG.len() - 1])
    }

    pub fn id(self) -> &'static str {
        self.descriptor().id
    }

    pub fn display_name(self) -> &'static str {
        self.descriptor().display_name
    }

    pub fn marker_url(self) -> &'static str {
        self.descriptor().marker_url
    }

    /// Look up a category by its id. Also accepts the legacy ids
    /// `campground`, `ranger_station` and `parks`.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "campground" => return Some(IconCategory::Bird),
            "ranger_station" => return Some(IconCategory::House),
            "parks" => return Some(IconCategory::Tree),
            _ => {}
        }
        CATALOG.iter().find(|d| d.id == id).map(|d| d.category)
    }

    /// Folder label for a raw id, falling back to [`OTHERS_LABEL`].
    pub fn folder_label_for_id(id: &str) -> &'static str {
        Self::from_id(id).map_or(OTHERS_LABEL, |c| c.display_name())
    }

    /// Infer a category from a marker URL. Unknown URLs map to pushpin.
    pub fn detect(url: &str) -> Self {
        CATALOG
            .iter()
            .find(|d| d.keywords.iter().any(|k| url.contains(k)))
            .map(|d| d.category)
            .unwrap_or_default()
    }
}

impl fmt::Display for IconCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
