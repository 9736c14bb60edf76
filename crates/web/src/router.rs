//! Regex route table
//!
//! Routes are kept in insertion order, which is also their priority: the first pattern
//! that matches a path wins, and duplicate patterns are allowed.
//!
//! Patterns are searched for anywhere in the path, so a pattern only matches the whole
//! path if it is anchored with `^` and `$`. POSIX bracket classes such as
//! `[[:digit:]]` are accepted.
//!
//! # Example
//!
//! ```
//! use http::StatusCode;
//! use reactor_web::{Router, get_fn};
//!
//! let router = Router::builder()
//!     .route("^/a/([0-9]+)$", get_fn(|request, _args| request.reply(StatusCode::OK, "A")))
//!     .build()
//!     .unwrap();
//!
//! assert!(router.find("/a/10").is_some());
//! assert_eq!(router.capture_arguments("/a/10"), vec!["10"]);
//! assert!(router.find("/a/x").is_none());
//! ```

use std::fmt;
use std::rc::Rc;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::handler::RequestHandler;

/// Upper bound on capture groups inspected per match, the whole-match group included.
pub const MAX_CAPTURES: usize = 16;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid route pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Ordered pattern-to-handler table.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

/// A compiled pattern bound to its handler.
struct Route {
    pattern: String,
    regex: Regex,
    handler: Rc<dyn RequestHandler>,
}

impl Route {
    fn new(pattern: String, handler: Rc<dyn RequestHandler>) -> Result<Self, RouterError> {
        let regex = Regex::new(&pattern).map_err(|source| RouterError::InvalidPattern { pattern: pattern.clone(), source })?;
        Ok(Self { pattern, regex, handler })
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn handler(&self) -> &Rc<dyn RequestHandler> {
        &self.handler
    }

    fn arguments(&self, path: &str) -> Vec<String> {
        let Some(captures) = self.regex.captures(path) else {
            return Vec::new();
        };

        (1..captures.len().min(MAX_CAPTURES))
            .map_while(|group| captures.get(group))
            .map(|matched| matched.as_str().to_owned())
            .collect()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Appends a route. It only wins for paths no earlier route matches.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] if `pattern` does not compile; the table is
    /// left unchanged.
    pub fn add_route<H>(&mut self, pattern: impl Into<String>, handler: H) -> Result<(), RouterError>
    where
        H: RequestHandler + 'static,
    {
        self.add_shared_route(pattern, Rc::new(handler))
    }

    /// Like [`Router::add_route`], for a handler that is already shared.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] if `pattern` does not compile.
    pub fn add_shared_route(&mut self, pattern: impl Into<String>, handler: Rc<dyn RequestHandler>) -> Result<(), RouterError> {
        let route = Route::new(pattern.into(), handler)?;
        debug!(pattern = %route.pattern, priority = self.routes.len(), "route added");
        self.routes.push(route);
        Ok(())
    }

    /// Handler of the first route whose pattern matches `path`.
    pub fn find(&self, path: &str) -> Option<&Rc<dyn RequestHandler>> {
        self.matching(path).map(Route::handler)
    }

    /// Substrings captured by the first matching route, in group order.
    ///
    /// Extraction stops at the first group that did not participate in the match. An
    /// unmatched path yields no arguments.
    pub fn capture_arguments(&self, path: &str) -> Vec<String> {
        self.matching(path).map(|route| route.arguments(path)).unwrap_or_default()
    }

    /// [`Router::find`] and [`Router::capture_arguments`] in a single scan.
    pub fn resolve(&self, path: &str) -> Option<(&Rc<dyn RequestHandler>, Vec<String>)> {
        self.matching(path).map(|route| (route.handler(), route.arguments(path)))
    }

    /// Removes the first route registered with exactly `pattern` and hands its handler back.
    pub fn remove_route(&mut self, pattern: &str) -> Option<Rc<dyn RequestHandler>> {
        let index = self.routes.iter().position(|route| route.pattern == pattern)?;
        debug!(pattern, "route removed");
        Some(self.routes.remove(index).handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn matching(&self, path: &str) -> Option<&Route> {
        let route = self.routes.iter().find(|route| route.regex.is_match(path));
        trace!(path, pattern = ?route.map(Route::pattern), "route lookup");
        route
    }
}

/// Collects routes and compiles them all at once in [`RouterBuilder::build`].
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<(String, Rc<dyn RequestHandler>)>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route<H>(mut self, pattern: impl Into<String>, handler: H) -> Self
    where
        H: RequestHandler + 'static,
    {
        self.routes.push((pattern.into(), Rc::new(handler)));
        self
    }

    /// # Errors
    ///
    /// Returns the error for the first pattern that does not compile.
    pub fn build(self) -> Result<Router, RouterError> {
        let routes = self.routes.into_iter().map(|(pattern, handler)| Route::new(pattern, handler)).collect::<Result<_, _>>()?;
        Ok(Router { routes })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes.iter().map(Route::pattern)).finish()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("pattern", &self.pattern).finish_non_exhaustive()
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.routes.iter().map(|(pattern, _)| pattern)).finish()
    }
}
