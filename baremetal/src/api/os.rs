use reqwest_middleware::{ClientWithMiddleware as Client, RequestBuilder};

/// How one install field behaves for a given operating system.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct OsField {
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl OsField {
    /// The caller must supply a value: the service requires one and has
    /// nothing to fall back on.
    pub fn needs_user_input(&self) -> bool {
        self.required && self.default_value.is_none()
    }
}

/// An installable operating system image.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct Os {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub custom_partitioning_supported: bool,
    #[serde(default)]
    pub ssh: OsField,
    #[serde(default)]
    pub user: OsField,
    #[serde(default)]
    pub password: OsField,
    #[serde(default)]
    pub service_user: OsField,
    #[serde(default)]
    pub service_password: OsField,
}

/// Request message for GetOs.
#[derive(Clone, PartialEq, Eq, Default, Debug, serde::Deserialize, serde::Serialize)]
pub struct GetOsRequest {
    #[serde(skip_serializing)]
    pub os_id: String,
}

pub(crate) fn build_get(base_url: &str, client: &Client, req: &GetOsRequest) -> RequestBuilder {
    client.get(format!("{base_url}/os/{}", req.os_id))
}
