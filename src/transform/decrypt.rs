// src/transform/decrypt.rs

use std::fs;
use std::path::PathBuf;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use regex::bytes::Regex;

/// Matches one encrypted segment:
/// `[kvsync|<auth text>|<ciphertext b64>|<nonce b64>|<key name>]`.
const TAG_PATTERN: &str = r"\[kvsync\|([^|\[\]]*)\|([^|\[\]]+)\|([^|\[\]]+)\|([^|\[\]]+)\]";

/// AES-256-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Decrypts tagged segments against a keystore directory.
///
/// The keystore holds one file per key name, each containing a base64-encoded
/// 256-bit key. The tag's auth text is bound into the ciphertext as
/// associated data.
pub struct Decryptor {
    keystore: PathBuf,
    tag: Regex,
}

impl Decryptor {
    pub fn new(keystore: impl Into<PathBuf>) -> Self {
        Self {
            keystore: keystore.into(),
            tag: Regex::new(TAG_PATTERN).expect("tag pattern is a valid regex"),
        }
    }

    /// Replace every tagged segment in `input` with its decrypted plaintext.
    ///
    /// Untagged input passes through unchanged. The first failing segment
    /// aborts the whole value.
    pub fn decrypt_tags(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        let mut last = 0usize;

        for caps in self.tag.captures_iter(input) {
            let whole = caps.get(0).expect("group 0 is the whole match");
            out.extend_from_slice(&input[last..whole.start()]);

            let auth = &caps[1];
            let ciphertext = BASE64
                .decode(&caps[2])
                .context("decoding ciphertext segment")?;
            let nonce = BASE64.decode(&caps[3]).context("decoding nonce segment")?;
            let key_name =
                std::str::from_utf8(&caps[4]).context("key name is not valid UTF-8")?;

            let plaintext = self.decrypt_segment(auth, &ciphertext, &nonce, key_name)?;
            out.extend_from_slice(&plaintext);
            last = whole.end();
        }

        out.extend_from_slice(&input[last..]);
        Ok(out)
    }

    fn decrypt_segment(
        &self,
        auth: &[u8],
        ciphertext: &[u8],
        nonce: &[u8],
        key_name: &str,
    ) -> Result<Vec<u8>> {
        if nonce.len() != NONCE_LEN {
            bail!(
                "nonce for key '{key_name}' must be {NONCE_LEN} bytes, got {}",
                nonce.len()
            );
        }

        let key = self.load_key(key_name)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));

        cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: auth,
                },
            )
            .map_err(|_| anyhow!("decryption failed for key '{key_name}'"))
    }

    fn load_key(&self, name: &str) -> Result<[u8; 32]> {
        // Key names come from the value payload; keep lookups inside the
        // keystore directory.
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            bail!("invalid key name '{name}'");
        }

        let path = self.keystore.join(name);
        let encoded = fs::read_to_string(&path)
            .with_context(|| format!("reading key file {:?}", path))?;
        let raw = BASE64
            .decode(encoded.trim().as_bytes())
            .with_context(|| format!("decoding key file {:?}", path))?;

        raw.as_slice()
            .try_into()
            .map_err(|_| anyhow!("key '{name}' must decode to 32 bytes, got {}", raw.len()))
    }
}
