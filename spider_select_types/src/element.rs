//! Raw page elements and snapshots.
//!
//! A snapshot is produced by an external capture service and consumed as-is.
//! Nothing in this crate mutates a snapshot after construction.

use crate::Role;
use serde::de::Error as _;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Page-relative bounding box.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    #[serde(default)]
    pub x: f64,
    /// Top edge.
    #[serde(default)]
    pub y: f64,
    /// Width.
    #[serde(default, alias = "w")]
    pub width: f64,
    /// Height.
    #[serde(default, alias = "h")]
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point, used as the click target.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether the box covers any area.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Viewport dimensions at capture time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    /// Width in CSS pixels.
    #[serde(default)]
    pub width: u32,
    /// Height in CSS pixels.
    #[serde(default)]
    pub height: u32,
}

impl Viewport {
    /// Create a new viewport.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A single element of a page snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawElement {
    /// Identifier, unique within its snapshot.
    pub id: u64,
    /// Interaction role, if the capture service assigned one.
    #[serde(default, deserialize_with = "deserialize_role")]
    pub role: Option<Role>,
    /// Source tag name.
    #[serde(default)]
    pub tag: String,
    /// Full visible text.
    #[serde(default)]
    pub text: String,
    /// Page-relative geometry.
    #[serde(default)]
    pub bbox: BoundingBox,
    /// Inside the viewport at capture time.
    #[serde(default)]
    pub in_viewport: bool,
    /// Fully covered by another element.
    #[serde(default)]
    pub is_occluded: bool,
    /// Accepts pointer interaction.
    #[serde(default)]
    pub is_clickable: bool,
    /// Styled as a primary call to action.
    #[serde(default)]
    pub is_primary: bool,
    /// Salience score. Opaque ordering key, non-negative.
    #[serde(default)]
    pub importance: f64,
    /// Auxiliary attributes such as `href`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl RawElement {
    /// Create a visible, clickable, in-viewport element.
    pub fn new(id: u64, role: Role, text: impl Into<String>) -> Self {
        Self {
            id,
            role: Some(role),
            tag: String::new(),
            text: text.into(),
            bbox: BoundingBox::new(0.0, 0.0, 100.0, 20.0),
            in_viewport: true,
            is_occluded: false,
            is_clickable: true,
            is_primary: false,
            importance: 0.0,
            attributes: BTreeMap::new(),
        }
    }

    /// Drop the role.
    pub fn without_role(mut self) -> Self {
        self.role = None;
        self
    }

    /// Set the tag name.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Set the bounding box.
    pub fn with_bbox(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bbox = BoundingBox::new(x, y, width, height);
        self
    }

    /// Set the importance score.
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    /// Set the in-viewport flag.
    pub fn with_in_viewport(mut self, in_viewport: bool) -> Self {
        self.in_viewport = in_viewport;
        self
    }

    /// Set the occluded flag.
    pub fn with_occluded(mut self, occluded: bool) -> Self {
        self.is_occluded = occluded;
        self
    }

    /// Set the clickable flag.
    pub fn with_clickable(mut self, clickable: bool) -> Self {
        self.is_clickable = clickable;
        self
    }

    /// Add an auxiliary attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Hyperlink target, if present.
    pub fn href(&self) -> Option<&str> {
        self.attributes.get("href").and_then(Value::as_str)
    }

    /// Exact click point from the uncompressed geometry.
    pub fn center(&self) -> (f64, f64) {
        self.bbox.center()
    }

    /// Role used for classification.
    ///
    /// With `infer_from_tag` set, an element without a role falls back to the
    /// implicit role of its tag.
    pub fn effective_role(&self, infer_from_tag: bool) -> Option<Role> {
        match &self.role {
            Some(role) => Some(role.clone()),
            None if infer_from_tag => Role::from_tag(&self.tag),
            None => None,
        }
    }
}

/// Point-in-time description of a page's interactive elements.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ElementSnapshot {
    /// Page URL.
    #[serde(default)]
    pub url: String,
    /// Viewport at capture time.
    #[serde(default)]
    pub viewport: Viewport,
    /// Elements in document order.
    #[serde(default)]
    pub elements: Vec<RawElement>,
    /// Capture time, seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: f64,
}

impl ElementSnapshot {
    /// Create a snapshot.
    pub fn new(url: impl Into<String>, viewport: Viewport, elements: Vec<RawElement>) -> Self {
        Self {
            url: url.into(),
            viewport,
            elements,
            timestamp: 0.0,
        }
    }

    /// Set the capture timestamp.
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Look up an element by identifier.
    pub fn get(&self, id: u64) -> Option<&RawElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    /// Whether an identifier exists in this snapshot.
    pub fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the snapshot has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Build a snapshot from the capture service's JSON payload.
    ///
    /// The service nests clickability under `visual_cues`, names the score
    /// `importance_score` and may omit ids. A missing id takes the element
    /// index when that is free, otherwise the next id above every id in use.
    /// Duplicate explicit ids are rejected.
    pub fn from_capture_json(value: &Value) -> Result<Self, serde_json::Error> {
        let wire: WireSnapshot = serde_json::from_value(value.clone())?;

        let mut taken = BTreeSet::new();
        for id in wire.elements.iter().filter_map(|e| e.id) {
            if !taken.insert(id) {
                return Err(serde_json::Error::custom(format!("duplicate element id {}", id)));
            }
        }
        let mut next = taken.last().map_or(0, |max| max.saturating_add(1));

        let mut elements = Vec::with_capacity(wire.elements.len());
        for (index, e) in wire.elements.into_iter().enumerate() {
            let id = match e.id {
                Some(id) => id,
                None if taken.insert(index as u64) => index as u64,
                None => {
                    while !taken.insert(next) {
                        next = next
                            .checked_add(1)
                            .ok_or_else(|| serde_json::Error::custom("element ids exhausted"))?;
                    }
                    next
                }
            };
            elements.push(e.into_element(id));
        }

        Ok(Self {
            url: wire.url,
            viewport: wire.viewport,
            elements,
            timestamp: wire.timestamp,
        })
    }
}

/// A blank role string reads as no role.
fn deserialize_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = serde::Deserialize::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Role::parse))
}

#[derive(serde::Deserialize)]
struct WireSnapshot {
    #[serde(default)]
    url: String,
    #[serde(default)]
    viewport: Viewport,
    #[serde(default)]
    elements: Vec<WireElement>,
    #[serde(default)]
    timestamp: f64,
}

#[derive(serde::Deserialize)]
struct WireElement {
    id: Option<u64>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    bbox: BoundingBox,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
    #[serde(default)]
    in_viewport: bool,
    #[serde(default)]
    is_occluded: bool,
    #[serde(default)]
    importance_score: f64,
    #[serde(default)]
    visual_cues: WireVisualCues,
}

#[derive(Default, serde::Deserialize)]
struct WireVisualCues {
    #[serde(default)]
    is_clickable: bool,
    #[serde(default)]
    is_primary: bool,
}

impl WireElement {
    fn into_element(self, id: u64) -> RawElement {
        RawElement {
            id,
            role: self.role.as_deref().and_then(Role::parse),
            tag: self.tag.unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            bbox: self.bbox,
            in_viewport: self.in_viewport,
            is_occluded: self.is_occluded,
            is_clickable: self.visual_cues.is_clickable,
            is_primary: self.visual_cues.is_primary,
            importance: self.importance_score.max(0.0),
            attributes: self.attributes,
        }
    }
}
