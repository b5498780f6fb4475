use std::collections::HashSet;

use kube::config::{AuthInfo, Kubeconfig};

use crate::error::{ParseError, ValidationError};
use crate::model::StoredSecret;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ClusterTarget {
    pub name: String,
    pub server: String,
}

impl ClusterTarget {
    pub fn comment(&self) -> String {
        format!("Cluster: {}\nServer: {}", self.name, self.server)
    }
}

pub fn parse(raw: &str) -> Result<Kubeconfig, ParseError> {
    let config = Kubeconfig::from_yaml(raw)?;
    unique_names("cluster", config.clusters.iter().map(|c| c.name.as_str()))?;
    unique_names("context", config.contexts.iter().map(|c| c.name.as_str()))?;
    unique_names("user", config.auth_infos.iter().map(|u| u.name.as_str()))?;
    Ok(config)
}

fn unique_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ParseError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ParseError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn server_of<'a>(config: &'a Kubeconfig, cluster: &str) -> Option<&'a str> {
    config
        .clusters
        .iter()
        .find(|named| named.name == cluster)
        .and_then(|named| named.cluster.as_ref())
        .and_then(|entry| entry.server.as_deref())
}

/// Checks the rules in order and reports the first one that fails.
pub fn validate(config: &Kubeconfig) -> Result<ClusterTarget, ValidationError> {
    if config.contexts.is_empty() {
        return Err(ValidationError::NoContexts);
    }
    if config.clusters.is_empty() {
        return Err(ValidationError::NoClusters);
    }

    let Some(current) = non_empty(config.current_context.as_deref()) else {
        return Err(ValidationError::NoCurrentContext);
    };
    let Some(named) = config.contexts.iter().find(|ctx| ctx.name == current) else {
        return Err(ValidationError::UnknownContext(current.to_string()));
    };
    let context = named.context.as_ref();

    let cluster_name = context.map(|ctx| ctx.cluster.clone()).unwrap_or_default();
    if !config.clusters.iter().any(|named| named.name == cluster_name) {
        return Err(ValidationError::UnknownCluster {
            cluster: cluster_name,
            context: current.to_string(),
        });
    }
    let Some(server) = non_empty(server_of(config, &cluster_name)) else {
        return Err(ValidationError::MissingServer(cluster_name));
    };
    let server = server.to_string();

    let Some(user_name) = non_empty(context.and_then(|ctx| ctx.user.as_deref())) else {
        return Err(ValidationError::NoUser(current.to_string()));
    };
    let Some(user) = config.auth_infos.iter().find(|user| user.name == user_name) else {
        return Err(ValidationError::UnknownUser {
            user: user_name.to_string(),
            context: current.to_string(),
        });
    };
    if !user.auth_info.as_ref().is_some_and(has_material) {
        return Err(ValidationError::NoAuthMaterial(user_name.to_string()));
    }

    Ok(ClusterTarget {
        name: cluster_name,
        server,
    })
}

// Any single material counts; certificate and key are not required to appear
// together. Inline secrets count once present.
fn has_material(auth: &AuthInfo) -> bool {
    auth.token.is_some()
        || auth.client_key_data.is_some()
        || auth.exec.is_some()
        || [
            &auth.token_file,
            &auth.client_certificate,
            &auth.client_certificate_data,
            &auth.client_key,
        ]
        .into_iter()
        .any(|field| non_empty(field.as_deref()).is_some())
}

/// Never fails: malformed payloads render their parse error instead.
pub fn render_preview(secret: &StoredSecret) -> String {
    match parse(&secret.value) {
        Ok(config) => format!(
            "Cluster: {}\nServer: {}\nComment: {}",
            secret.key,
            server_of(&config, &secret.key).unwrap_or_default(),
            secret.comment
        ),
        Err(error) => format!("Error parsing kubeconfig: {error}"),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const MINIMAL: &str = "\
apiVersion: v1
kind: Config
clusters:
- name: c1
  cluster:
    server: https://x
contexts:
- name: c1
  context:
    cluster: c1
    user: admin
current-context: c1
users:
- name: admin
  user:
    token: abc
";

    pub fn with_server(cluster: &str, server: &str) -> String {
        format!(
            "clusters:\n- name: {cluster}\n  cluster:\n    server: {server}\n\
contexts:\n- name: {cluster}\n  context:\n    cluster: {cluster}\n    user: admin\n\
current-context: {cluster}\n\
users:\n- name: admin\n  user:\n    token: abc\n"
        )
    }
}
