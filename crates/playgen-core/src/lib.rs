//! Playgen Core Library
//!
//! Generates Scala Play Framework server projects from Swagger 2.0 and
//! OpenAPI 3 specifications. A [`Backend`] describes one target: its
//! options, naming rules, type mapping and template selection. The
//! [`Generator`] drives a backend over a specification and emits the
//! rendered files.

pub mod backend;
pub mod codegen;
pub mod config;
pub mod error;
pub mod generate;
pub mod manifest;
pub mod naming;
pub mod openapi;
pub mod options;
pub mod templates;
pub mod types;
pub mod utils;

pub use crate::{
    backend::{Backend, BackendInfo, BackendSetup, GeneratorRegistry, GeneratorTag},
    codegen::{CodegenApi, CodegenModel, CodegenOperation, CodegenProperty},
    config::Config,
    error::{Error, Result},
    generate::{emit, generate, GenerationSummary, Generator, Plan, RenderedFile},
    manifest::OutputManifest,
    openapi::OpenApiContext,
    options::{parse_override, parse_overrides, CliOption, GeneratorOptions, OverridePolicy, ResolvedOptions},
    templates::{ArtifactKind, TemplateDir, TemplateManager},
};
