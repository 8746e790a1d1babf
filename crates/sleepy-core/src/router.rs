//! Router implementation using radix tree (matchit)
//!
//! Calls are registered under their full path (`base + prefix + suffix`)
//! using `{param}` segments:
//!
//! - `/v2/users` - Static path
//! - `/v2/users/{uid}` - Single parameter
//!
//! Each path owns a small method table, so one path can serve several
//! methods. Registering the same method twice on one path, or two paths
//! that the radix tree cannot tell apart, is a [`RegistrationError`].

use crate::error::RegistrationError;
use http::Method;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;

/// Methods registered for one path, in registration order
#[derive(Debug, Clone)]
struct MethodTable<T> {
    path: String,
    entries: Vec<(Method, T)>,
}

impl<T> MethodTable<T> {
    fn get(&self, method: &Method) -> Option<&T> {
        self.entries
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, target)| target)
    }

    fn allowed_methods(&self) -> Vec<Method> {
        self.entries.iter().map(|(m, _)| m.clone()).collect()
    }
}

/// Maps `(path, method)` to a route target
#[derive(Clone)]
pub(crate) struct Router<T> {
    inner: MatchitRouter<usize>,
    tables: Vec<MethodTable<T>>,
    /// matchit path -> table index
    registered: HashMap<String, usize>,
}

/// Result of route matching
pub(crate) enum RouteMatch<'a, T> {
    Found {
        target: &'a T,
        params: HashMap<String, String>,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
}

impl<T> Router<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: MatchitRouter::new(),
            tables: Vec::new(),
            registered: HashMap::new(),
        }
    }

    /// Add a route target for `method` on `path`
    pub(crate) fn insert(
        &mut self,
        path: &str,
        method: Method,
        target: T,
    ) -> Result<(), RegistrationError> {
        let matchit_path = convert_path_params(path);

        if let Some(&index) = self.registered.get(&matchit_path) {
            let table = &mut self.tables[index];
            if table.get(&method).is_some() {
                return Err(RegistrationError::DuplicateRoute {
                    path: path.to_string(),
                    method: method.to_string(),
                    details: format!("`{} {}` is already registered", method, table.path),
                });
            }
            table.entries.push((method, target));
            return Ok(());
        }

        let index = self.tables.len();
        self.inner
            .insert(matchit_path.clone(), index)
            .map_err(|e| RegistrationError::DuplicateRoute {
                path: path.to_string(),
                method: method.to_string(),
                details: match self.find_conflicting_route(&matchit_path) {
                    Some(existing) => format!("conflicts with `{}`: {}", existing, e),
                    None => e.to_string(),
                },
            })?;

        self.tables.push(MethodTable {
            path: path.to_string(),
            entries: vec![(method, target)],
        });
        self.registered.insert(matchit_path, index);
        Ok(())
    }

    /// Find a registered route with the same shape but different parameter names
    fn find_conflicting_route(&self, matchit_path: &str) -> Option<&str> {
        let normalized_new = normalize_path_for_comparison(matchit_path);
        self.registered
            .iter()
            .find(|(registered, _)| normalize_path_for_comparison(registered) == normalized_new)
            .map(|(_, &index)| self.tables[index].path.as_str())
    }

    /// Match a request path and method
    pub(crate) fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_, T> {
        match self.inner.at(path) {
            Ok(matched) => {
                let table = &self.tables[*matched.value];
                match table.get(method) {
                    Some(target) => RouteMatch::Found {
                        target,
                        params: matched
                            .params
                            .iter()
                            .map(|(k, v)| (k.to_string(), v.to_string()))
                            .collect(),
                    },
                    None => RouteMatch::MethodNotAllowed {
                        allowed: table.allowed_methods(),
                    },
                }
            }
            Err(_) => RouteMatch::NotFound,
        }
    }

    /// Methods registered for the path a request would match, if any
    pub(crate) fn allowed_methods(&self, path: &str) -> Option<Vec<Method>> {
        self.inner
            .at(path)
            .ok()
            .map(|matched| self.tables[*matched.value].allowed_methods())
    }

    pub(crate) fn len(&self) -> usize {
        self.tables.iter().map(|t| t.entries.len()).sum()
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert {param} style to :param for matchit
fn convert_path_params(path: &str) -> String {
    let mut result = String::with_capacity(path.len());

    for ch in path.chars() {
        match ch {
            '{' => result.push(':'),
            '}' => {}
            _ => result.push(ch),
        }
    }

    result
}

/// Replace parameter names with a placeholder so `/a/:x` and `/a/:y` compare equal
fn normalize_path_for_comparison(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut in_param = false;

    for ch in path.chars() {
        match ch {
            ':' => {
                in_param = true;
                result.push_str(":_");
            }
            '/' => {
                in_param = false;
                result.push('/');
            }
            _ if in_param => {}
            _ => result.push(ch),
        }
    }

    result
}

/// Normalize a path prefix.
///
/// The result starts with exactly one slash, has no trailing slash and no
/// empty segments. An empty prefix normalizes to `/`.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = String::with_capacity(prefix.len() + 1);
    for segment in segments {
        result.push('/');
        result.push_str(segment);
    }

    result
}

/// Join the API base path, a resource prefix and a call suffix
pub(crate) fn join_path(base: &str, prefix: &str, suffix: &str) -> String {
    normalize_prefix(&format!("{}/{}/{}", base, prefix, suffix))
}

/// Names of the `{param}` segments of a registered path
pub(crate) fn path_param_names(path: &str) -> Vec<&str> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
        .collect()
}
