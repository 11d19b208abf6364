//! Cinder and Keystone JSON bodies.

use cirrus_core::{VolumeRecord, VolumeSpec};
use serde::{Deserialize, Serialize};

/// Volume as returned by `GET /volumes/detail` and `POST /volumes`
#[derive(Debug, Clone, Deserialize)]
pub struct CinderVolume {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<CinderVolume> for VolumeRecord {
    fn from(v: CinderVolume) -> Self {
        VolumeRecord {
            id: v.id,
            name: v.name.unwrap_or_default(),
            status: v.status,
            size_gib: v.size,
            volume_type: v.volume_type,
            description: v.description,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    pub href: String,
    #[serde(default)]
    pub rel: String,
}

#[derive(Debug, Deserialize)]
pub struct VolumeList {
    #[serde(default)]
    pub volumes: Vec<CinderVolume>,
    #[serde(default)]
    pub volumes_links: Vec<Link>,
}

impl VolumeList {
    /// The `rel=next` link, if the listing continues
    pub fn next_href(&self) -> Option<String> {
        self.volumes_links
            .iter()
            .find(|l| l.rel == "next")
            .map(|l| l.href.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct VolumeEnvelope {
    pub volume: CinderVolume,
}

#[derive(Debug, Serialize)]
pub struct CreateVolumeBody<'a> {
    pub volume: CreateVolumeOpts<'a>,
}

#[derive(Debug, Serialize)]
pub struct CreateVolumeOpts<'a> {
    pub name: &'a str,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<&'a str>,
    pub description: &'a str,
}

impl<'a> From<&'a VolumeSpec> for CreateVolumeBody<'a> {
    fn from(spec: &'a VolumeSpec) -> Self {
        CreateVolumeBody {
            volume: CreateVolumeOpts {
                name: &spec.name,
                size: spec.size_gib,
                volume_type: spec.volume_type.as_deref(),
                description: &spec.description,
            },
        }
    }
}

/// Extract the human-readable message from an OpenStack fault body.
///
/// Cinder wraps faults in a single-key object such as
/// `{"badRequest": {"message": "...", "code": 400}}`; Keystone uses
/// `{"error": {"message": "..."}}`. Anything else is returned as-is.
pub fn fault_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed)
    {
        for (kind, detail) in &map {
            if let Some(message) = detail.get("message").and_then(|m| m.as_str()) {
                return format!("{}: {}", kind, message);
            }
        }
    }
    trimmed.to_string()
}

// --- Keystone v3 ---

#[derive(Debug, Serialize)]
pub struct AuthRequest<'a> {
    pub auth: Auth<'a>,
}

#[derive(Debug, Serialize)]
pub struct Auth<'a> {
    pub identity: Identity<'a>,
    pub scope: Scope<'a>,
}

#[derive(Debug, Serialize)]
pub struct Identity<'a> {
    pub methods: [&'static str; 1],
    pub password: PasswordMethod<'a>,
}

#[derive(Debug, Serialize)]
pub struct PasswordMethod<'a> {
    pub user: PasswordUser<'a>,
}

#[derive(Debug, Serialize)]
pub struct PasswordUser<'a> {
    pub name: &'a str,
    pub domain: NamedRef<'a>,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct NamedRef<'a> {
    pub name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Scope<'a> {
    pub project: IdRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct IdRef<'a> {
    pub id: &'a str,
}

impl<'a> AuthRequest<'a> {
    pub fn password(user: &'a str, domain: &'a str, password: &'a str, project_id: &'a str) -> Self {
        AuthRequest {
            auth: Auth {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: PasswordUser {
                            name: user,
                            domain: NamedRef { name: domain },
                            password,
                        },
                    },
                },
                scope: Scope {
                    project: IdRef { id: project_id },
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: Token,
}

#[derive(Debug, Default, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEndpoint {
    pub url: String,
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
}

impl CatalogEndpoint {
    fn in_region(&self, region: &str) -> bool {
        self.region_id.as_deref() == Some(region) || self.region.as_deref() == Some(region)
    }
}

/// Pick the public endpoint of the first matching service type in `region`.
///
/// `service_types` is in order of preference.
pub fn select_endpoint(
    catalog: &[CatalogEntry],
    service_types: &[&str],
    region: &str,
) -> Option<String> {
    service_types.iter().find_map(|wanted| {
        catalog
            .iter()
            .filter(|entry| entry.service_type == *wanted)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|ep| ep.interface == "public" && ep.in_region(region))
            .map(|ep| ep.url.trim_end_matches('/').to_string())
    })
}
