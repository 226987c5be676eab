//! Host-supplied configuration with shallow section merges.

use serde::{Deserialize, Serialize};

/// Nested configuration the host embedder passes to `configure`. Each call
/// merges shallowly: a provided section overrides only the fields it
/// actually provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionConfig {
    pub pdf: Option<PdfConfig>,
    pub annotations: Option<AnnotationEndpoints>,
    pub user: Option<UserConfig>,
    pub security: Option<SecurityConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PdfConfig {
    pub url: Option<String>,
    /// Raw document bytes supplied programmatically (blob / array buffer
    /// in a browser host). Never serialized.
    #[serde(skip)]
    pub bytes: Option<Vec<u8>>,
    /// When false, a configured `url` is opened immediately and location
    /// parameters may not override it.
    pub allow_url_parameter: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationEndpoints {
    pub get_url: Option<String>,
    pub post_url: Option<String>,
    pub auto_load: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserConfig {
    pub username: Option<String>,
    pub default_editor_active: Option<String>,
    pub default_sidebar_open: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecurityConfig {
    /// A URL is allowed when its hostname equals or is a subdomain of any
    /// entry. Empty or absent means allow all.
    pub allowed_domains: Option<Vec<String>>,
    /// Maximum byte length for buffer/blob loads; absent means unbounded.
    pub max_file_size: Option<u64>,
    pub allowed_file_types: Option<Vec<String>>,
}

fn merge_field<T>(target: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *target = incoming;
    }
}

impl ExtensionConfig {
    /// Shallow-merge another configuration into this one.
    pub fn merge(&mut self, incoming: ExtensionConfig) {
        if let Some(pdf) = incoming.pdf {
            let target = self.pdf.get_or_insert_with(PdfConfig::default);
            merge_field(&mut target.url, pdf.url);
            merge_field(&mut target.bytes, pdf.bytes);
            target.allow_url_parameter = pdf.allow_url_parameter;
        }
        if let Some(annotations) = incoming.annotations {
            let target = self.annotations.get_or_insert_with(AnnotationEndpoints::default);
            merge_field(&mut target.get_url, annotations.get_url);
            merge_field(&mut target.post_url, annotations.post_url);
            merge_field(&mut target.auto_load, annotations.auto_load);
        }
        if let Some(user) = incoming.user {
            let target = self.user.get_or_insert_with(UserConfig::default);
            merge_field(&mut target.username, user.username);
            merge_field(&mut target.default_editor_active, user.default_editor_active);
            merge_field(&mut target.default_sidebar_open, user.default_sidebar_open);
        }
        if let Some(security) = incoming.security {
            let target = self.security.get_or_insert_with(SecurityConfig::default);
            merge_field(&mut target.allowed_domains, security.allowed_domains);
            merge_field(&mut target.max_file_size, security.max_file_size);
            merge_field(&mut target.allowed_file_types, security.allowed_file_types);
        }
    }
}
