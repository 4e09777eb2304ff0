//! Scene document: the serializable content of the editing surface.

use crate::shapes::{ObjectId, SceneObject};
use serde::{Deserialize, Serialize};

/// Current serialization format version.
pub const SCENE_FORMAT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SCENE_FORMAT_VERSION
}

/// All objects on the surface, back to front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Objects in z-order (back to front).
    pub objects: Vec<SceneObject>,
}

impl SceneDocument {
    /// Create an empty document for a surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            version: SCENE_FORMAT_VERSION,
            width,
            height,
            objects: Vec::new(),
        }
    }

    /// Add an object on top of everything else.
    pub fn push(&mut self, object: SceneObject) {
        self.objects.push(object);
    }

    /// Remove all objects.
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    /// Get an object by ID.
    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.iter().find(|obj| obj.id() == id)
    }

    /// Get a mutable reference to an object by ID.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.iter_mut().find(|obj| obj.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Serialize the document to compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
