//! Server-side HTML rendering.
//!
//! Templates are compiled into the binary from `templates/` and loaded into
//! a single `minijinja` environment at startup. Names ending in `.html` are
//! auto-escaped.

use anyhow::{Context, Result};
use minijinja::Environment;
use rust_embed::RustEmbed;
use serde::Serialize;

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/templates/"]
struct TemplateAssets;

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn load() -> Result<Self> {
        let mut env = Environment::new();
        let mut count = 0usize;
        for name in TemplateAssets::iter() {
            let file = TemplateAssets::get(&name)
                .with_context(|| format!("Embedded template {} disappeared", name))?;
            let source = String::from_utf8(file.data.into_owned())
                .with_context(|| format!("Template {} is not valid UTF-8", name))?;
            env.add_template_owned(name.to_string(), source)
                .with_context(|| format!("Failed to parse template {}", name))?;
            count += 1;
        }
        tracing::debug!(count, "templates loaded");
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, context: S) -> Result<String> {
        let template = self
            .env
            .get_template(name)
            .with_context(|| format!("Unknown template {}", name))?;
        template
            .render(context)
            .with_context(|| format!("Failed to render {}", name))
    }
}
