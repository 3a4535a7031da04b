use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

use crate::api::Escape;

/// Request message for CreateBucket.
#[derive(Clone, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketRequest {
    #[serde(skip_serializing)]
    pub name: String,
    /// Project owning the bucket; the client default applies when empty.
    #[serde(skip_serializing)]
    pub project_id: Option<String>,
    /// Enables object lock at creation; cannot be turned on later.
    #[serde(skip_serializing)]
    pub object_lock_enabled_for_bucket: bool,
}

pub(crate) fn build(base_url: &str, client: &Client, req: &CreateBucketRequest) -> RequestBuilder {
    let url = format!("{base_url}/{}", req.name.escape());
    let mut builder = client.put(url);
    if req.object_lock_enabled_for_bucket {
        builder = builder.header("x-amz-bucket-object-lock-enabled", "true");
    }
    if let Some(project_id) = &req.project_id {
        builder = builder.header("x-scw-project-id", project_id);
    }
    builder
}
