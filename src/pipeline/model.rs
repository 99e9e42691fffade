use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    pub const ALL: [Self; 6] = [
        Self::Running,
        Self::Queued,
        Self::Finished,
        Self::Failed,
        Self::Aborted,
        Self::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// RELION job kinds the dashboard knows how to present. Anything else the
/// backend reports is kept verbatim in `Other`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum JobKind {
    Import,
    MotionCorr,
    CtfFind,
    ManualPick,
    AutoPick,
    Extract,
    Class2D,
    Select,
    Class3D,
    Refine3D,
    InitialModel,
    PostProcess,
    CtfRefine,
    Polish,
    LocalRes,
    MaskCreate,
    Reconstruct,
    Other(String),
}

impl From<String> for JobKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Import" => Self::Import,
            "MotionCorr" => Self::MotionCorr,
            "CtfFind" => Self::CtfFind,
            "ManualPick" => Self::ManualPick,
            "AutoPick" => Self::AutoPick,
            "Extract" => Self::Extract,
            "Class2D" => Self::Class2D,
            "Select" => Self::Select,
            "Class3D" => Self::Class3D,
            "Refine3D" => Self::Refine3D,
            "InitialModel" => Self::InitialModel,
            "PostProcess" => Self::PostProcess,
            "CtfRefine" => Self::CtfRefine,
            "Polish" => Self::Polish,
            "LocalRes" => Self::LocalRes,
            "MaskCreate" => Self::MaskCreate,
            "Reconstruct" => Self::Reconstruct,
            _ => Self::Other(value),
        }
    }
}

impl JobKind {
    pub fn label(&self) -> &str {
        match self {
            Self::Import => "Import",
            Self::MotionCorr => "MotionCorr",
            Self::CtfFind => "CtfFind",
            Self::ManualPick => "ManualPick",
            Self::AutoPick => "AutoPick",
            Self::Extract => "Extract",
            Self::Class2D => "Class2D",
            Self::Select => "Select",
            Self::Class3D => "Class3D",
            Self::Refine3D => "Refine3D",
            Self::InitialModel => "InitialModel",
            Self::PostProcess => "PostProcess",
            Self::CtfRefine => "CtfRefine",
            Self::Polish => "Polish",
            Self::LocalRes => "LocalRes",
            Self::MaskCreate => "MaskCreate",
            Self::Reconstruct => "Reconstruct",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Kinds whose outputs include a density map or mask.
    pub fn produces_volume(&self) -> bool {
        matches!(
            self,
            Self::Refine3D
                | Self::Class3D
                | Self::PostProcess
                | Self::Reconstruct
                | Self::MaskCreate
                | Self::InitialModel
        )
    }

    /// Kinds the backend serves `/api/analysis` payloads for.
    pub fn has_analysis(&self) -> bool {
        matches!(
            self,
            Self::Refine3D
                | Self::Class3D
                | Self::InitialModel
                | Self::PostProcess
                | Self::CtfFind
                | Self::Polish
                | Self::CtfRefine
        )
    }

    pub fn groups_by_binfactor(&self) -> bool {
        matches!(self, Self::Extract | Self::Reconstruct)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub status: JobStatus,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub binfactor: Option<f64>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub has_results: bool,
    #[serde(default)]
    pub has_3d: bool,
    #[serde(default)]
    pub resolution: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
}

/// One complete backend snapshot. Never patched in place; a refresh replaces
/// the whole value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub project_dir: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Pipeline {
    /// Last node carrying `id`, matching the last-write-wins rule used by the
    /// id-keyed graph structures.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().rev().find(|node| node.id == id)
    }

    pub fn status_counts(&self) -> Vec<(JobStatus, usize)> {
        JobStatus::ALL
            .iter()
            .filter_map(|status| {
                let count = self.nodes.iter().filter(|node| node.status == *status).count();
                (count > 0).then_some((*status, count))
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct JobDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: JobKind,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub command_history: Vec<String>,
}

impl JobDetail {
    /// Most recent command with the leading `date time: ` stamp removed.
    pub fn latest_command(&self) -> Option<&str> {
        let last = self.command_history.last()?;
        let stamp_end = last
            .char_indices()
            .find(|(_, ch)| !(ch.is_ascii_digit() || matches!(ch, '-' | ':' | ' ' | '.')))
            .map(|(index, _)| index)
            .unwrap_or(last.len());
        let stamp = &last[..stamp_end];
        match stamp.rfind(": ") {
            Some(split) => Some(&last[split + 2..]),
            None => Some(last.as_str()),
        }
    }
}

impl Default for JobKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<String>,
}

/// MRC header fields served by `/api/mapinfo`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MapInfo {
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
    pub voxel_size: f64,
    #[serde(default)]
    pub rms: Option<f64>,
    #[serde(default)]
    pub dmin: Option<f64>,
    #[serde(default)]
    pub dmax: Option<f64>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse().ok(),
        _ => None,
    })
}
