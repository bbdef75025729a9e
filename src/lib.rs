// Module layout (Clean Architecture style)
// - bootstrap: configuration and startup wiring
// - infrastructure: file store, extensions directory, prompts, event fan-out
// - presentation: tree view models, drag and drop, CLI
// - application: ports, group repository and command use cases
// - domain: groups, add-on references, group file format

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
