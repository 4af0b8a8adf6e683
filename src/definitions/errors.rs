use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DefinitionsError {
    #[error("No `.blimu` directory found in `{start}` or any parent directory")]
    #[diagnostic(
        code(blimu::definitions::not_found),
        help("Run the command inside a project containing .blimu/resources.yml, or pass the project directory explicitly")
    )]
    NotFound { start: String },

    #[error("Required definition file `{path}` is missing")]
    #[diagnostic(
        code(blimu::definitions::missing_required),
        help("Every project needs a resources.yml mapping resource names to their roles")
    )]
    MissingRequired { path: String },

    #[error("Failed to read definition file `{path}`")]
    #[diagnostic(code(blimu::definitions::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse definition file `{path}`: {source}")]
    #[diagnostic(
        code(blimu::definitions::parse),
        help("Check the YAML syntax and that each entry has the expected shape")
    )]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write definition file `{path}`")]
    #[diagnostic(code(blimu::definitions::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {section} definitions: {source}")]
    #[diagnostic(code(blimu::definitions::serialize))]
    Serialize {
        section: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("At least one resource must be defined")]
    #[diagnostic(
        code(blimu::definitions::no_resources),
        help("Add a resource to .blimu/resources.yml, e.g.\norganization:\n  roles: [admin, member]")
    )]
    NoResources,
}
