//! Request routing over declared method templates.

pub mod params;
pub mod resolver;
pub mod template;

pub use params::{coerce, extract_parameter, PathParameter};
pub use resolver::{request_suffix, select_method, ResolvedRoute, RouteResolver};
pub use template::{RouteTemplate, Segment, TemplateMatch};
