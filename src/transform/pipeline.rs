// src/transform/pipeline.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use crate::transform::decrypt::Decryptor;
use crate::transform::template::{Template, TemplateFunc};

/// Per-mapping transform applied to each value before it is written.
///
/// Stage order: decrypt tagged segments, parse the plaintext as a template,
/// execute it with no variable context. The template's function set contains
/// a single `decrypt` function that can decrypt inline-tagged segments
/// against the same keystore.
pub struct TransformPipeline {
    decryptor: Arc<Decryptor>,
}

impl TransformPipeline {
    pub fn new(keystore: impl Into<PathBuf>) -> Self {
        Self {
            decryptor: Arc::new(Decryptor::new(keystore)),
        }
    }

    /// Produce the bytes actually written for one value.
    pub fn apply(&self, raw: &[u8]) -> Result<Vec<u8>> {
        let decrypted = self
            .decryptor
            .decrypt_tags(raw)
            .context("decrypting tagged segments")?;
        let text =
            String::from_utf8(decrypted).context("decrypted value is not valid UTF-8")?;

        let template = Template::parse(&text).context("parsing template")?;

        let decryptor = Arc::clone(&self.decryptor);
        let mut funcs: HashMap<String, TemplateFunc> = HashMap::new();
        funcs.insert(
            "decrypt".to_string(),
            Box::new(move |arg: &str| {
                let plain = decryptor.decrypt_tags(arg.as_bytes())?;
                String::from_utf8(plain)
                    .map_err(|err| anyhow!("decrypted segment is not valid UTF-8: {err}"))
            }),
        );

        let rendered = template.render(&funcs).context("executing template")?;
        Ok(rendered.into_bytes())
    }
}
