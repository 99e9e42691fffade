//! Request/response client for the dashboard backend.
//!
//! Job ids are path-like (`Refine3D/job010`) and are appended to the route
//! verbatim; the backend matches them with greedy path parameters.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::model::{FileList, JobDetail, MapInfo, Pipeline};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Backend-relative path of a file listed by `/api/files/{job_id}`.
pub fn job_file_path(job_id: &str, file_name: &str) -> String {
    format!("{}/{}", job_id.trim_end_matches('/'), file_name.trim_start_matches('/'))
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_owned(),
        }
    }

    pub fn pipeline_url(&self) -> String {
        format!("{}/api/pipeline", self.base)
    }

    pub fn job_url(&self, job_id: &str) -> String {
        format!("{}/api/job/{job_id}", self.base)
    }

    pub fn log_url(&self, job_id: &str) -> String {
        format!("{}/api/log/{job_id}", self.base)
    }

    pub fn files_url(&self, job_id: &str) -> String {
        format!("{}/api/files/{job_id}", self.base)
    }

    /// Download link for one output of a job.
    pub fn job_file_url(&self, job_id: &str, file_name: &str) -> String {
        self.file_url(&job_file_path(job_id, file_name))
    }

    pub fn file_url(&self, file_path: &str) -> String {
        format!("{}/api/file/{file_path}", self.base)
    }

    pub fn map_info_url(&self, file_path: &str) -> String {
        format!("{}/api/mapinfo/{file_path}", self.base)
    }

    pub fn analysis_url(&self, node_id: &str) -> String {
        format!("{}/api/analysis/{node_id}", self.base)
    }

    pub async fn fetch_pipeline(&self) -> Result<Pipeline, ApiError> {
        self.get_json(self.pipeline_url()).await
    }

    pub async fn fetch_job(&self, job_id: &str) -> Result<JobDetail, ApiError> {
        self.get_json(self.job_url(job_id)).await
    }

    pub async fn fetch_log(&self, job_id: &str) -> Result<String, ApiError> {
        let url = self.log_url(job_id);
        let response = self.get_ok(&url).await?;
        Ok(response.text().await?)
    }

    pub async fn fetch_files(&self, job_id: &str) -> Result<Vec<String>, ApiError> {
        let list: FileList = self.get_json(self.files_url(job_id)).await?;
        Ok(list.files)
    }

    /// Header metadata for a map, or `None` when the backend cannot read it.
    pub async fn fetch_map_info(&self, file_path: &str) -> Option<MapInfo> {
        match self.get_json::<Option<MapInfo>>(self.map_info_url(file_path)).await {
            Ok(info) => info,
            Err(error) => {
                tracing::debug!(file_path, %error, "map header unavailable");
                None
            }
        }
    }

    /// Job-type-specific analysis payload. `null` and `{}` mean the backend
    /// has nothing for this job and map to `None`.
    pub async fn fetch_analysis(&self, node_id: &str) -> Result<Option<Value>, ApiError> {
        let value: Value = self.get_json(self.analysis_url(node_id)).await?;
        Ok(match value {
            Value::Null => None,
            Value::Object(ref map) if map.is_empty() => None,
            other => Some(other),
        })
    }

    async fn get_ok(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        let response = self.get_ok(&url).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| ApiError::Decode { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_files_resolve_under_the_job_directory() {
        let api = ApiClient::new("http://localhost:3000");
        assert_eq!(
            job_file_path("PostProcess/job011", "postprocess.mrc"),
            "PostProcess/job011/postprocess.mrc"
        );
        assert_eq!(
            api.job_file_url("Refine3D/job010/", "/run_data.star"),
            "http://localhost:3000/api/file/Refine3D/job010/run_data.star"
        );
    }

    #[test]
    fn routes_keep_path_like_ids_intact() {
        let api = ApiClient::new("http://localhost:3000/");
        assert_eq!(api.pipeline_url(), "http://localhost:3000/api/pipeline");
        assert_eq!(
            api.job_url("Refine3D/job010"),
            "http://localhost:3000/api/job/Refine3D/job010"
        );
        assert_eq!(
            api.log_url("Class3D/job009"),
            "http://localhost:3000/api/log/Class3D/job009"
        );
        assert_eq!(
            api.files_url("Extract/job004"),
            "http://localhost:3000/api/files/Extract/job004"
        );
        assert_eq!(
            api.file_url("Refine3D/job010/run_class001.mrc"),
            "http://localhost:3000/api/file/Refine3D/job010/run_class001.mrc"
        );
        assert_eq!(
            api.map_info_url("PostProcess/job011/postprocess.mrc"),
            "http://localhost:3000/api/mapinfo/PostProcess/job011/postprocess.mrc"
        );
        assert_eq!(
            api.analysis_url("CtfFind/job003"),
            "http://localhost:3000/api/analysis/CtfFind/job003"
        );
    }

    #[test]
    fn status_error_names_the_url() {
        let error = ApiError::Status {
            status: 404,
            url: "http://h/api/log/x".to_owned(),
        };
        assert_eq!(error.to_string(), "http://h/api/log/x returned HTTP 404");
    }
}
