use std::path::Path;

use blimu::session::Session;
use blimu::settings::{Environment, Settings};
use tempfile::TempDir;

/// Builder for on-disk projects with a `.blimu/` directory
pub struct ProjectBuilder {
    files: Vec<(&'static str, String)>,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// A small, fully consistent project
    pub fn valid() -> Self {
        Self::new()
            .resources(
                r#"
organization:
  roles: [admin, member]
workspace:
  roles: [admin, editor, viewer]
  roles_inheritance:
    admin: ["organization->admin"]
    viewer: ["organization->member"]
  parents:
    organization:
      required: true
"#,
            )
            .entitlements(
                r#"
workspace:create:
  roles: [admin]
  plans: [pro]
workspace:read:
  roles: [admin, editor, viewer]
"#,
            )
            .features(
                r#"
sso:
  plans: [pro]
  entitlements: [workspace:create]
"#,
            )
            .plans(
                r#"
free:
  name: Free
  description: Starter tier
pro:
  name: Pro
  description: For teams
"#,
            )
    }

    pub fn resources(self, yaml: &str) -> Self {
        self.file("resources.yml", yaml)
    }

    pub fn entitlements(self, yaml: &str) -> Self {
        self.file("entitlements.yml", yaml)
    }

    pub fn features(self, yaml: &str) -> Self {
        self.file("features.yml", yaml)
    }

    pub fn plans(self, yaml: &str) -> Self {
        self.file("plans.yml", yaml)
    }

    pub fn sdk_config(self, yaml: &str) -> Self {
        self.file("config.yml", yaml)
    }

    pub fn file(mut self, name: &'static str, contents: &str) -> Self {
        self.files.retain(|(n, _)| *n != name);
        self.files.push((name, contents.to_string()));
        self
    }

    pub fn create(self) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        self.write_into(dir.path());
        dir
    }

    pub fn write_into(self, root: &Path) {
        let blimu = root.join(".blimu");
        std::fs::create_dir_all(&blimu).expect("Failed to create .blimu");
        for (name, contents) in self.files {
            std::fs::write(blimu.join(name), contents).expect("Failed to write definition file");
        }
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a session pointing at a test API
pub struct SessionBuilder {
    api_url: String,
    api_key: Option<String>,
    access_token: Option<String>,
    workspace_id: Option<String>,
    environment_id: Option<String>,
    generator: Option<String>,
}

impl SessionBuilder {
    pub fn new(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            api_key: Some("sk_test".to_string()),
            access_token: None,
            workspace_id: Some("ws_test".to_string()),
            environment_id: Some("env_test".to_string()),
            generator: None,
        }
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn without_ids(mut self) -> Self {
        self.workspace_id = None;
        self.environment_id = None;
        self
    }

    pub fn with_generator(mut self, program: &str) -> Self {
        self.generator = Some(program.to_string());
        self
    }

    /// Settings are saved under `settings_dir`
    pub fn create(self, settings_dir: &Path) -> Session {
        let mut settings = Settings {
            path: settings_dir.join("config.toml"),
            ..Default::default()
        };
        if let Some(generator) = self.generator {
            settings.generator = generator;
        }
        settings.upsert_environment(Environment {
            name: "test".to_string(),
            api_url: Some(self.api_url),
            workspace_id: self.workspace_id,
            environment_id: self.environment_id,
            api_key: self.api_key,
            access_token: self.access_token,
            ..Default::default()
        });
        Session::new(settings)
    }
}
