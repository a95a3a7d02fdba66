/*
 * Structured Error Definitions.
 */

#![allow(unused_assignments)]

use miette::{Diagnostic, NamedSource, SourceSpan};
use snafu::prelude::*;

#[derive(Debug, Snafu, Diagnostic)]
#[snafu(visibility(pub))]
pub enum VerError {
    /// The configuration file could not be read.
    #[snafu(display("Failed to read config at {path}"))]
    #[diagnostic(
        code(verinfo::config::unreadable),
        help("Check that the file exists and is readable.")
    )]
    ConfigRead {
        /// The path to the file.
        path: String,
        source: std::io::Error,
    },

    /// Error when parsing configuration files.
    #[snafu(display("Failed to parse config at {path}: {reason}"))]
    #[diagnostic(
        code(verinfo::config::invalid_format),
        help("Ensure the configuration file is valid YAML.")
    )]
    ConfigParse {
        /// The path to the file.
        path: String,
        reason: String,
        /// The source code for snippet rendering.
        #[source_code]
        src: NamedSource<String>,
        /// The location of the error.
        #[label("syntax error here")]
        span: Option<SourceSpan>,
    },

    /// A brief or detail template failed to compile.
    #[snafu(display("Template `{name}` is invalid: {reason}"))]
    #[diagnostic(
        code(verinfo::template::syntax),
        help("Templates use minijinja syntax; check for unbalanced tags and unknown filters.")
    )]
    TemplateSyntax {
        name: String,
        reason: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[snafu(display("Failed to render template `{name}`: {reason}"))]
    #[diagnostic(code(verinfo::template::render))]
    TemplateRender { name: String, reason: String },

    /// A scripted filter from the configuration did not compile.
    #[snafu(display("Failed to compile filter `{function}`: {reason}"))]
    #[diagnostic(
        code(verinfo::filter::compile),
        help("Filter bodies are Rhai scripts; check the `filters` section.")
    )]
    FilterCompile { function: String, reason: String },

    #[snafu(display("Failed to write version information"))]
    #[diagnostic(code(verinfo::output))]
    Output { source: std::io::Error },
}
