use std::collections::BTreeMap;

use serde_json::Value;

use crate::backend::{Reply, Request};
use crate::pipeline::{JobDetail, JobKind, MapInfo, Node};

#[derive(Clone, Debug, Default, PartialEq)]
pub enum PanelState<T> {
    #[default]
    Idle,
    Loading,
    Ready(T),
    Unavailable,
    Failed(String),
}

impl<T> PanelState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetailTab {
    #[default]
    Params,
    Analysis,
    Log,
    Outputs,
    Map3D,
}

impl DetailTab {
    pub fn label(self) -> &'static str {
        match self {
            Self::Params => "Params",
            Self::Analysis => "Analysis",
            Self::Log => "Log",
            Self::Outputs => "Outputs",
            Self::Map3D => "3D Map",
        }
    }
}

/// Detail data fetched for the current selection.
///
/// Every reset starts a new generation, and each request is stamped with it.
/// A reply lands only if both its id and its generation match the current
/// selection, so reselecting the same job does not revive earlier replies.
#[derive(Debug, Default)]
pub struct DetailState {
    generation: u64,
    job_id: Option<String>,
    kind: Option<JobKind>,
    has_3d: bool,
    pub tab: DetailTab,
    pub job: PanelState<JobDetail>,
    pub files: PanelState<Vec<String>>,
    pub analysis: PanelState<Value>,
    map_info: BTreeMap<String, PanelState<MapInfo>>,
    selected_map: Option<String>,
}

impl DetailState {
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn reset_for(&mut self, job_id: Option<&str>, node: Option<&Node>) -> Vec<Request> {
        *self = Self {
            generation: self.generation + 1,
            job_id: job_id.map(str::to_owned),
            kind: node.map(|node| node.kind.clone()),
            has_3d: node.is_some_and(|node| node.has_3d),
            ..Self::default()
        };

        let Some(job_id) = job_id else {
            return Vec::new();
        };

        self.job = PanelState::Loading;
        self.files = PanelState::Loading;
        let seq = self.generation;
        let mut requests = vec![
            Request::Job {
                job_id: job_id.to_owned(),
                seq,
            },
            Request::Files {
                job_id: job_id.to_owned(),
                seq,
            },
        ];

        if self.has_analysis() {
            self.analysis = PanelState::Loading;
            requests.push(Request::Analysis {
                job_id: job_id.to_owned(),
                seq,
            });
        } else {
            self.analysis = PanelState::Unavailable;
        }

        requests
    }

    pub fn sync_node(&mut self, node: Option<&Node>) {
        if let Some(node) = node {
            self.kind = Some(node.kind.clone());
            self.has_3d = node.has_3d;
        }
    }

    pub fn has_analysis(&self) -> bool {
        self.kind.as_ref().is_some_and(JobKind::has_analysis)
    }

    pub fn has_map(&self) -> bool {
        self.has_3d && self.kind.as_ref().is_some_and(JobKind::produces_volume)
    }

    pub fn tabs(&self) -> Vec<DetailTab> {
        let mut tabs = vec![DetailTab::Params];
        if self.has_analysis() {
            tabs.push(DetailTab::Analysis);
        }
        tabs.extend([DetailTab::Log, DetailTab::Outputs]);
        if self.has_map() {
            tabs.push(DetailTab::Map3D);
        }
        tabs
    }

    pub fn map_candidates(&self) -> Vec<&str> {
        self.files
            .ready()
            .map(|files| {
                files
                    .iter()
                    .map(String::as_str)
                    .filter(|file| file.to_ascii_lowercase().ends_with(".mrc"))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn selected_map(&self) -> Option<&str> {
        self.selected_map.as_deref()
    }

    pub fn map_info(&self, file_path: &str) -> Option<&PanelState<MapInfo>> {
        self.map_info.get(file_path)
    }

    pub fn request_map(&mut self, file_path: &str) -> Option<Request> {
        let job_id = self.job_id.clone()?;
        self.selected_map = Some(file_path.to_owned());
        if self.map_info.contains_key(file_path) {
            return None;
        }
        self.map_info
            .insert(file_path.to_owned(), PanelState::Loading);
        Some(Request::MapInfo {
            job_id,
            seq: self.generation,
            file_path: file_path.to_owned(),
        })
    }

    pub fn default_map_request(&mut self) -> Option<Request> {
        if self.selected_map.is_some() || !self.has_map() {
            return None;
        }
        let kind = self.kind.clone().unwrap_or_default();
        let best = best_map(&self.map_candidates(), &kind)?.to_owned();
        self.request_map(&best)
    }

    pub fn apply(&mut self, reply: Reply) -> bool {
        let current = (self.job_id.as_deref(), self.generation);
        match reply {
            Reply::Job {
                job_id,
                seq,
                result,
            } => {
                if !is_current(current, (&job_id, seq), "job") {
                    return false;
                }
                self.job = into_panel(result.map(Some));
            }
            Reply::Files {
                job_id,
                seq,
                result,
            } => {
                if !is_current(current, (&job_id, seq), "files") {
                    return false;
                }
                self.files = into_panel(result.map(Some));
            }
            Reply::Analysis {
                job_id,
                seq,
                result,
            } => {
                if !is_current(current, (&job_id, seq), "analysis") {
                    return false;
                }
                self.analysis = into_panel(result);
            }
            Reply::MapInfo {
                job_id,
                seq,
                file_path,
                info,
            } => {
                if !is_current(current, (&job_id, seq), "map info") {
                    return false;
                }
                let state = match info {
                    Some(info) => PanelState::Ready(info),
                    None => PanelState::Unavailable,
                };
                self.map_info.insert(file_path, state);
            }
            Reply::Pipeline { .. } | Reply::Log { .. } => return false,
        }
        true
    }
}

/// Most informative map among `maps` for a job of `kind`: the canonical
/// output name when present, the last iteration's first class for
/// classifications, otherwise the first map listed.
pub fn best_map<'a>(maps: &[&'a str], kind: &JobKind) -> Option<&'a str> {
    let preferred: &[&str] = match kind {
        JobKind::Refine3D => &["run_class001.mrc", "run_half1_class001_unfil.mrc"],
        JobKind::PostProcess => &["postprocess_masked.mrc", "postprocess.mrc"],
        JobKind::Reconstruct => &["merged.mrc", "half1.mrc"],
        JobKind::MaskCreate => &["mask.mrc"],
        _ => &[],
    };
    if let Some(found) = preferred
        .iter()
        .find_map(|name| maps.iter().copied().find(|map| map == name))
    {
        return Some(found);
    }

    if matches!(kind, JobKind::Class3D | JobKind::Class2D)
        && let Some(latest) = maps
            .iter()
            .copied()
            .filter_map(|map| class_one_iteration(map).map(|iteration| (iteration, map)))
            .max_by_key(|(iteration, _)| *iteration)
    {
        return Some(latest.1);
    }

    maps.first().copied()
}

fn class_one_iteration(map: &str) -> Option<u32> {
    let stem = map.strip_suffix("_class001.mrc")?;
    let digits = &stem[stem.rfind("it")? + 2..];
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_current(
    (current_id, generation): (Option<&str>, u64),
    (job_id, seq): (&str, u64),
    what: &'static str,
) -> bool {
    let fresh = current_id == Some(job_id) && seq == generation;
    if !fresh {
        tracing::debug!(job_id = %job_id, seq, generation, what, "discarding stale detail reply");
    }
    fresh
}

fn into_panel<T, E: std::fmt::Display>(result: Result<Option<T>, E>) -> PanelState<T> {
    match result {
        Ok(Some(value)) => PanelState::Ready(value),
        Ok(None) => PanelState::Unavailable,
        Err(error) => PanelState::Failed(error.to_string()),
    }
}
