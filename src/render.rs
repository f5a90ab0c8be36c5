//! Rendering of the active rule set for proxy backends
//!
//! Real backend renderers (Apache/HAProxy-style templates) live outside
//! this crate; the engine only hands them the ordered active set and
//! matches deployments by content digest. This module carries the renderer
//! contract, the digest helper, and a reference plain-text renderer used by
//! the daemon and the digest-stability tests.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::RenderError;
use crate::pipeline::ActiveSnapshot;

/// Renderer for one proxy backend
pub trait Renderer {
    /// Backend name, used for output file naming and logs
    fn name(&self) -> &str;

    /// Render the snapshot into configuration bytes.
    ///
    /// Output must be deterministic: the same snapshot must render to the
    /// same bytes, because deployment confirmation compares digests across
    /// controller instances and restarts.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if formatting fails.
    fn render(&self, snapshot: &ActiveSnapshot) -> Result<Vec<u8>, RenderError>;
}

/// Compute the 128-bit content digest of rendered bytes, as lowercase hex.
///
/// SHA-256 truncated to 16 bytes; the digest identifies configuration
/// content for deployment confirmation, not for security.
///
/// # Example
///
/// ```
/// use route_control::render::content_digest;
///
/// let digest = content_digest(b"frontend rules v1");
/// assert_eq!(digest.len(), 32);
/// assert_eq!(digest, content_digest(b"frontend rules v1"));
/// assert_ne!(digest, content_digest(b"frontend rules v2"));
/// ```
#[must_use]
pub fn content_digest(bytes: &[u8]) -> String {
    let hash = Sha256::digest(bytes);
    hex::encode(&hash[..16])
}

/// Reference renderer: one `pattern -> target` line per active rule.
///
/// The line order is the emission order, so a first-match-wins proxy
/// consuming this listing behaves exactly as the conflict graph dictates.
#[derive(Debug, Clone, Default)]
pub struct ProxyListRenderer;

impl ProxyListRenderer {
    /// Create a new proxy-list renderer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Renderer for ProxyListRenderer {
    fn name(&self) -> &str {
        "proxy-list"
    }

    fn render(&self, snapshot: &ActiveSnapshot) -> Result<Vec<u8>, RenderError> {
        let mut out = String::new();
        out.push_str("# route-control active rules\n");
        for rule in &snapshot.rules {
            out.push_str(rule.pattern());
            out.push_str(" -> ");
            out.push_str(rule.target());
            out.push_str("  # ");
            out.push_str(rule.owner().as_str());
            out.push('\n');
        }
        Ok(out.into_bytes())
    }
}

/// Render a snapshot through each renderer and write `<name>.cfg` plus
/// `<name>.digest` into `output_dir`.
///
/// Returns `(renderer name, digest)` pairs for the deployment waiter.
///
/// # Errors
///
/// Returns `RenderError` if rendering or writing fails.
pub fn write_outputs(
    snapshot: &ActiveSnapshot,
    renderers: &[Box<dyn Renderer + Send + Sync>],
    output_dir: &Path,
) -> Result<Vec<(String, String)>, RenderError> {
    let mut digests = Vec::with_capacity(renderers.len());
    for renderer in renderers {
        let bytes = renderer.render(snapshot)?;
        let digest = content_digest(&bytes);

        let config_path = output_dir.join(format!("{}.cfg", renderer.name()));
        let digest_path = output_dir.join(format!("{}.digest", renderer.name()));
        std::fs::write(&config_path, &bytes)?;
        std::fs::write(&digest_path, &digest)?;

        debug!(
            "Rendered {} ({} bytes, digest {})",
            renderer.name(),
            bytes.len(),
            digest
        );
        digests.push((renderer.name().to_string(), digest));
    }
    Ok(digests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{rebuild_population, Application};
    use crate::tokens::TokenDictionary;

    fn snapshot() -> ActiveSnapshot {
        let tokens = TokenDictionary::empty();
        let apps = vec![
            Application::new("a")
                .with_target("10.0.0.1:80")
                .with_rule("/app/**")
                .with_rule("/"),
            Application::new("b")
                .with_target("10.0.0.2:80")
                .with_rule("/app/a*"),
        ];
        let outcome = rebuild_population(&[], &apps, &tokens);
        ActiveSnapshot {
            version: 1,
            rules: outcome.ordered,
            blocked: outcome.blocked,
            invalid: outcome.invalid,
            rejected: outcome.rejected,
            active_owners: outcome.activation_order,
        }
    }

    #[test]
    fn test_digest_is_128_bit_hex() {
        let digest = content_digest(b"config bytes");
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_proxy_list_renders_in_emission_order() {
        let rendered = ProxyListRenderer::new().render(&snapshot()).unwrap();
        let text = String::from_utf8(rendered).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# route-control active rules");
        assert!(lines[1].starts_with("/ -> 10.0.0.1:80"));
        assert!(lines[2].starts_with("/app/a* -> 10.0.0.2:80"));
        assert!(lines[3].starts_with("/app/** -> 10.0.0.1:80"));
    }

    #[test]
    fn test_render_is_digest_stable() {
        let renderer = ProxyListRenderer::new();
        let first = renderer.render(&snapshot()).unwrap();
        let second = renderer.render(&snapshot()).unwrap();
        assert_eq!(content_digest(&first), content_digest(&second));
    }

    #[test]
    fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let renderers: Vec<Box<dyn Renderer + Send + Sync>> =
            vec![Box::new(ProxyListRenderer::new())];

        let digests = write_outputs(&snapshot(), &renderers, dir.path()).unwrap();
        assert_eq!(digests.len(), 1);
        assert_eq!(digests[0].0, "proxy-list");

        let config = std::fs::read(dir.path().join("proxy-list.cfg")).unwrap();
        let digest = std::fs::read_to_string(dir.path().join("proxy-list.digest")).unwrap();
        assert_eq!(digest, content_digest(&config));
    }
}
