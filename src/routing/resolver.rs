//! Picks the declared API and method an incoming request targets.

use crate::config::{normalize_base_url, ApiDefinition, MethodDefinition};
use crate::error::GatewayError;
use crate::routing::template::RouteTemplate;
use crate::store::DefinitionStore;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ResolvedRoute {
    pub api: ApiDefinition,
    pub method: MethodDefinition,
}

/// Remainder of `path` after `base_url`, when the base url prefixes it at a segment boundary.
/// The result is empty or starts with `/`.
pub fn request_suffix<'p>(path: &'p str, base_url: &str) -> Option<&'p str> {
    let path = normalize_base_url(path);
    let base = normalize_base_url(base_url);
    if base.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Method for `verb` whose template matches `suffix`. More literal segments win; remaining ties go to
/// the earliest method in `methods`.
pub fn select_method<'m>(methods: &'m [MethodDefinition], verb: &str, suffix: &str) -> Option<&'m MethodDefinition> {
    let mut best: Option<(&MethodDefinition, usize)> = None;
    for method in methods.iter().filter(|m| m.verb.eq_ignore_ascii_case(verb)) {
        let template = match RouteTemplate::parse(&method.url) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(method_id = %method.id, error = %e, "skipping method with malformed url");
                continue;
            }
        };
        if template.match_suffix(suffix).is_none() {
            continue;
        }
        let score = template.literal_count();
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((method, score));
        }
    }
    best.map(|(m, _)| m)
}

pub struct RouteResolver {
    definitions: Arc<dyn DefinitionStore>,
}

impl RouteResolver {
    pub fn new(definitions: Arc<dyn DefinitionStore>) -> Self {
        RouteResolver { definitions }
    }

    pub async fn resolve_api(&self, path: &str) -> Result<ApiDefinition, GatewayError> {
        let path = normalize_base_url(path);
        self.definitions
            .api_by_url_prefix(path)
            .await?
            .ok_or_else(|| GatewayError::ApiNotFound(path.to_string()))
    }

    pub async fn resolve_method(
        &self,
        verb: &str,
        path: &str,
        api: &ApiDefinition,
    ) -> Result<MethodDefinition, GatewayError> {
        let not_found = || GatewayError::MethodNotFound {
            verb: verb.to_string(),
            path: normalize_base_url(path).to_string(),
        };
        let suffix = request_suffix(path, &api.url).ok_or_else(not_found)?;
        let methods = self.definitions.methods_by_api_id(&api.id).await?;
        tracing::debug!(api_id = %api.id, suffix, candidates = methods.len(), "resolving method");
        select_method(&methods, verb, suffix).cloned().ok_or_else(not_found)
    }

    pub async fn resolve(&self, verb: &str, path: &str) -> Result<ResolvedRoute, GatewayError> {
        let api = self.resolve_api(path).await?;
        let method = self.resolve_method(verb, path, &api).await?;
        Ok(ResolvedRoute { api, method })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefinitionBundle;
    use crate::store::memory::MemoryDefinitionStore;
    use crate::store::DefinitionWriter;

    fn method(id: &str, verb: &str, url: &str) -> MethodDefinition {
        MethodDefinition {
            id: id.into(),
            api_id: "pets-api".into(),
            verb: verb.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    #[test]
    fn suffix_respects_segment_boundaries() {
        assert_eq!(request_suffix("/pets", "pets"), Some(""));
        assert_eq!(request_suffix("/pets/42", "/pets"), Some("/42"));
        assert_eq!(request_suffix("/pets/42/", "pets/"), Some("/42"));
        assert_eq!(request_suffix("/petshop", "pets"), None);
        assert_eq!(request_suffix("/v1/pets/7", "v1/pets"), Some("/7"));
    }

    #[test]
    fn empty_template_resolves_base_url() {
        let methods = vec![method("get-one", "GET", "/{id}"), method("list", "GET", "")];
        assert_eq!(select_method(&methods, "GET", "").unwrap().id, "list");
        assert_eq!(select_method(&methods, "GET", "/42").unwrap().id, "get-one");
    }

    #[test]
    fn verb_must_match() {
        let methods = vec![method("list", "GET", "")];
        assert!(select_method(&methods, "POST", "").is_none());
        assert_eq!(select_method(&methods, "get", "").unwrap().id, "list");
    }

    #[test]
    fn literal_template_beats_parameter_template() {
        let methods = vec![method("by-id", "GET", "/{id}"), method("search", "GET", "/search")];
        assert_eq!(select_method(&methods, "GET", "/search").unwrap().id, "search");
        assert_eq!(select_method(&methods, "GET", "/7").unwrap().id, "by-id");
    }

    #[test]
    fn malformed_templates_are_skipped() {
        let methods = vec![method("broken", "GET", "/{a}/{b}"), method("ok", "GET", "/{a}/x")];
        assert_eq!(select_method(&methods, "GET", "/1/x").unwrap().id, "ok");
        assert!(select_method(&methods, "GET", "/1/2").is_none());
    }

    #[tokio::test]
    async fn resolves_api_then_method() {
        let store = Arc::new(MemoryDefinitionStore::new());
        store
            .install(&DefinitionBundle {
                apis: vec![ApiDefinition {
                    id: "pets-api".into(),
                    name: "pets".into(),
                    url: "pets".into(),
                    ..Default::default()
                }],
                methods: vec![method("list", "GET", ""), method("get-one", "GET", "/{id}")],
                models: vec![],
            })
            .await
            .unwrap();
        let resolver = RouteResolver::new(store);

        let route = resolver.resolve("GET", "/pets/42").await.unwrap();
        assert_eq!(route.api.id, "pets-api");
        assert_eq!(route.method.id, "get-one");

        assert!(matches!(
            resolver.resolve("GET", "/owners").await,
            Err(GatewayError::ApiNotFound(_))
        ));
        assert!(matches!(
            resolver.resolve("DELETE", "/pets/42").await,
            Err(GatewayError::MethodNotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve("GET", "/pets/42/toys").await,
            Err(GatewayError::MethodNotFound { .. })
        ));
    }
}
