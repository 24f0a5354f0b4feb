use crate::{ElementKey, Transform};

/// One element of a [`RigPose`]. Transform-bearing elements carry `local`/`global`,
/// curves carry `curve_value`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct RigPoseElement {
    pub key: ElementKey,
    pub local: Transform,
    pub global: Transform,
    #[cfg_attr(feature = "json", serde(default))]
    pub curve_value: f32,
}

/// Flat pose snapshot, keyed by element so that it can be replayed in any order.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct RigPose {
    pub format_version: u32,
    pub topology_version: u32,
    pub topology_hash: u64,
    pub elements: Vec<RigPoseElement>,
}

impl RigPose {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn find(&self, key: &ElementKey) -> Option<&RigPoseElement> {
        self.elements.iter().find(|e| &e.key == key)
    }

    pub fn is_compatible_with(&self, hierarchy: &crate::RigHierarchy) -> bool {
        self.format_version == crate::POSE_FORMAT_VERSION
            && self.topology_hash == hierarchy.topology_hash()
    }
}

#[cfg(feature = "json")]
impl RigPose {
    pub fn to_json_string(&self) -> Result<String, crate::Error> {
        serde_json::to_string_pretty(self).map_err(|e| crate::Error::PoseParse {
            message: e.to_string(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        let pose: RigPose = serde_json::from_str(json).map_err(|e| crate::Error::PoseParse {
            message: e.to_string(),
        })?;
        if pose.format_version != crate::POSE_FORMAT_VERSION {
            return Err(crate::Error::UnsupportedPoseVersion {
                found: pose.format_version,
                expected: crate::POSE_FORMAT_VERSION,
            });
        }
        Ok(pose)
    }
}
