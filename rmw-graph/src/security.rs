use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

/// A security artifact is resolved either from a PKCS#11 token reference
/// or from a file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactSource<'a> {
    /// A `*.p11` file whose content is a `pkcs11:` URI. Only consulted
    /// when the transport supports PKCS#11.
    Pkcs11(&'a str),
    /// A regular file under the secure root.
    File(&'a str),
}

struct Artifact<'a> {
    name: &'a str,
    sources: &'a [ArtifactSource<'a>],
}

const REQUIRED_ARTIFACTS: &[Artifact<'_>] = &[
    Artifact {
        name: "IDENTITY_CA",
        sources: &[
            ArtifactSource::Pkcs11("identity_ca.cert.p11"),
            ArtifactSource::File("identity_ca.cert.pem"),
        ],
    },
    Artifact {
        name: "CERTIFICATE",
        sources: &[
            ArtifactSource::Pkcs11("cert.p11"),
            ArtifactSource::File("cert.pem"),
        ],
    },
    Artifact {
        name: "PRIVATE_KEY",
        sources: &[
            ArtifactSource::Pkcs11("key.p11"),
            ArtifactSource::File("key.pem"),
        ],
    },
    Artifact {
        name: "PERMISSIONS_CA",
        sources: &[
            ArtifactSource::Pkcs11("permissions_ca.cert.p11"),
            ArtifactSource::File("permissions_ca.cert.pem"),
        ],
    },
    Artifact {
        name: "GOVERNANCE",
        sources: &[ArtifactSource::File("governance.p7s")],
    },
    Artifact {
        name: "PERMISSIONS",
        sources: &[ArtifactSource::File("permissions.p7s")],
    },
];

const OPTIONAL_ARTIFACTS: &[Artifact<'_>] = &[Artifact {
    name: "CRL",
    sources: &[ArtifactSource::File("crl.pem")],
}];

/// Reads a `*.p11` file and returns the `pkcs11:` URI it holds. The URI
/// is the first whitespace-delimited token of the file.
fn read_pkcs11_uri(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let uri = content.split_whitespace().next()?;
    if !uri.starts_with("pkcs11:") {
        debug!("ignoring '{}': content is not a pkcs11 URI", path.display());
        return None;
    }
    Some(uri.to_string())
}

fn resolve_artifact(
    artifact: &Artifact<'_>,
    supports_pkcs11: bool,
    prefix: &str,
    secure_root: &Path,
) -> Option<String> {
    for source in artifact.sources {
        match source {
            ArtifactSource::Pkcs11(file_name) => {
                if !supports_pkcs11 {
                    continue;
                }
                let path = secure_root.join(file_name);
                if !path.is_file() {
                    continue;
                }
                // The URI already carries its own scheme; the caller's
                // prefix applies to file paths only.
                if let Some(uri) = read_pkcs11_uri(&path) {
                    return Some(uri);
                }
            }
            ArtifactSource::File(file_name) => {
                let path = secure_root.join(file_name);
                if path.is_file() {
                    return Some(format!("{}{}", prefix, path.display()));
                }
            }
        }
    }
    None
}

/// Resolves the DDS security artifacts under `secure_root`.
///
/// Each required artifact is looked up by its PKCS#11 form first (when
/// `supports_pkcs11` is set), then by its file form, with `prefix`
/// prepended to resolved file paths (typically a `file://` scheme).
/// Returns `None` if any required artifact is missing; optional
/// artifacts are included only when present.
pub fn get_security_files(
    supports_pkcs11: bool,
    prefix: &str,
    secure_root: impl AsRef<Path>,
) -> Option<HashMap<String, String>> {
    let secure_root = secure_root.as_ref();
    let mut result = HashMap::new();
    for artifact in REQUIRED_ARTIFACTS {
        match resolve_artifact(artifact, supports_pkcs11, prefix, secure_root) {
            Some(resolved) => {
                result.insert(artifact.name.to_string(), resolved);
            }
            None => {
                debug!(
                    "required security artifact '{}' not found under '{}'",
                    artifact.name,
                    secure_root.display()
                );
                return None;
            }
        }
    }
    for artifact in OPTIONAL_ARTIFACTS {
        if let Some(resolved) = resolve_artifact(artifact, supports_pkcs11, prefix, secure_root) {
            result.insert(artifact.name.to_string(), resolved);
        }
    }
    Some(result)
}
